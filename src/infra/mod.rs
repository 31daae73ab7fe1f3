pub mod http_client;
pub mod object_store;
pub mod pdf_reader;
pub mod sqlite_source;
pub mod sqlite_warehouse;
pub mod store_api_client;

pub use object_store::HttpObjectStore;
pub use pdf_reader::LopdfTableReader;
pub use sqlite_source::SqliteSource;
pub use sqlite_warehouse::SqliteWarehouse;
pub use store_api_client::ReqwestStoreApi;
