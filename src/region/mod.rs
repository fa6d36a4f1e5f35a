/// Boot region, BIOS parameter block and extended boot record
pub(crate) mod boot;

/// FAT region, one or more copies of the cluster table
pub(crate) mod fat;

/// Data region, directory entry layouts
pub(crate) mod data;
