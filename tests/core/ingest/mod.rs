pub mod test_incremental;
pub mod test_selection;
pub mod test_vcs;
