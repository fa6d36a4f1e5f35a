use fatvfs::error::{DeviceError, Error};
use fatvfs::io::std::FileDevice;
use fatvfs::io::BlockDevice;
use pretty_hex::PrettyHex;

pub fn dump(mut device: FileDevice, sector: u64, count: usize) -> Result<(), Error> {
    let mut buf = vec![0u8; count * device.sector_size()];
    device.read(sector.into(), &mut buf).map_err(DeviceError::from)?;
    println!("{:?}", buf.hex_dump());
    Ok(())
}
