use fatvfs::error::Error;
use fatvfs::io::std::FileDevice;
use fatvfs::FatDriver;

pub fn list(device: FileDevice, path: &str) -> Result<(), Error> {
    let volume = FatDriver::try_create(device)?;
    for entry in volume.read_dir(path)? {
        let attrs = entry.attributes();
        if entry.is_volume_label() {
            continue;
        }
        print!("{}", if attrs.directory() { "d" } else { "-" });
        print!("{}", if attrs.read_only() { "r" } else { "-" });
        print!("{}", if attrs.system() { "s" } else { "-" });
        print!("{}", if attrs.hidden() { "h" } else { "-" });
        print!("{}", if attrs.archive() { "a" } else { "-" });
        print!(" {:10}", entry.size());
        match entry.short.modified.to_chrono() {
            Some(modified) => print!(" {}", modified.format("%Y-%m-%d %H:%M:%S")),
            None => print!(" {:19}", "-"),
        }
        if attrs.directory() {
            println!(" {}/", entry.name());
        } else {
            println!(" {}", entry.name());
        }
    }
    Ok(())
}
