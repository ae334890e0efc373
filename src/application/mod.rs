pub mod bootstrap;
pub mod completion;
pub mod garbage_collector;
pub mod mutations;
pub mod settings;
pub mod state;
pub mod sync;
pub mod timeline;
