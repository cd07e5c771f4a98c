pub mod sqlite_label_store;
