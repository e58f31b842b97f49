pub mod local_validation_archive;
