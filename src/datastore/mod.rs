mod datastore;

pub use datastore::Filter;
pub use datastore::HashMapStorage;
pub use datastore::TaskDataStore;
