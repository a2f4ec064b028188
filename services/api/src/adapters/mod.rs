pub mod db;
pub mod docbuilder;

pub use db::DbAdapter;
pub use docbuilder::HttpDocBuilder;
