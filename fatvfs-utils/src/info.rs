use fatvfs::error::Error;
use fatvfs::io::std::FileDevice;
use fatvfs::FatDriver;

pub fn info(device: FileDevice) -> Result<(), Error> {
    let volume = FatDriver::try_create(device)?;
    let geometry = volume.geometry();
    println!("Type:                {}", geometry.fat_type);
    println!("Label:               {}", volume.volume_label());
    println!("Bytes per sector:    {}", geometry.bytes_per_sector);
    println!("Sectors per cluster: {}", geometry.sectors_per_cluster);
    println!("Reserved sectors:    {}", geometry.reserved_sectors);
    println!("FATs:                {} x {} sectors", geometry.number_of_fats, geometry.fat_sectors);
    println!("Root dir sectors:    {}", geometry.root_dir_sectors);
    println!("First data sector:   {}", geometry.first_data_sector);
    println!("Clusters:            {}", geometry.total_clusters);
    println!("Size:                {} bytes", geometry.total_size());
    Ok(())
}
