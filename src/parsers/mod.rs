pub mod metadata_tree;
