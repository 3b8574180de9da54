pub mod blobstorage;
pub mod email;
