use std::io;
use std::io::Write;

use fatvfs::error::Error;
use fatvfs::io::std::FileDevice;
use fatvfs::vfs::ProcessFiles;
use fatvfs::System;

use super::stdout_error;

pub fn cat(device: FileDevice, path: &str) -> Result<(), Error> {
    let system = System::new();
    system.mount_device("/", device)?;
    let vfs = system.vfs();
    let mut process = ProcessFiles::new(std::process::id());
    let path = format!("/{}", path.trim().trim_start_matches('/'));
    let fds = vfs.open(&mut process, &path)?;
    let mut stdout = io::stdout();
    let mut buf = [0u8; 4096];
    let mut offset = 0;
    loop {
        let size = vfs.read(&process, fds.process, &mut buf, offset)?;
        if size == 0 {
            break;
        }
        stdout.write_all(&buf[..size]).map_err(stdout_error)?;
        offset += size as u64;
    }
    vfs.close(&mut process, fds.process)
}
