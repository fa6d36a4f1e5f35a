use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::ops::Range;

use spin::Mutex;

use crate::directory::{DirEntry, EntryIter};
use crate::driver::{FilesystemDriver, StorageDevice};
use crate::error::{DataError, Error, ImplementationError, InputError, OperationError};
use crate::fat::{Chain, FAT};
use crate::file::{FileMetadata, Locator};
use crate::fs::{DirectoryLocation, Geometry};
use crate::io::{BlockDevice, RawIO, Wrap};
use crate::name::ShortName;
use crate::region::boot::{BootRecord, FATType, BOOT_RECORD_SIZE};
use crate::types::{ClusterID, SectorID};

/// FAT12/16/32 filesystem over one block device
pub struct FatDriver<D> {
    device: Mutex<D>,
    boot: BootRecord,
    geometry: Geometry,
    fat: FAT,
    label: heapless::String<11>,
}

impl<D: BlockDevice> FatDriver<D> {
    /// Probe sector 0 and take ownership of `device` if it holds a FAT volume.
    ///
    /// `DataError::NotFAT` means the device is readable but unformatted or
    /// formatted with something else.
    pub fn try_create(mut device: D) -> Result<Self, Error> {
        let mut sector = [0u8; BOOT_RECORD_SIZE];
        (&mut device).wrap().read_raw(0, &mut sector)?;
        let boot = BootRecord::decode(&sector);
        if !boot.is_fat() {
            debug!("Sector 0 holds no FAT boot record");
            return Err(DataError::NotFAT.into());
        }
        let geometry = Geometry::new(&boot)?;
        let label = boot.volume_label(geometry.fat_type);
        info!(
            "{} volume {:?}: {} clusters of {} bytes, {} bytes total",
            geometry.fat_type,
            label.as_str(),
            geometry.total_clusters,
            geometry.cluster_size(),
            geometry.total_size()
        );
        debug!("Geometry {:?}", geometry);
        Ok(Self { device: Mutex::new(device), boot, fat: FAT::new(&geometry), geometry, label })
    }

    pub fn into_inner(self) -> D {
        self.device.into_inner()
    }

    pub fn fat_type(&self) -> FATType {
        self.geometry.fat_type
    }

    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn boot_record(&self) -> &BootRecord {
        &self.boot
    }

    pub fn volume_label(&self) -> &str {
        self.label.as_str()
    }

    pub(crate) fn fat(&self) -> &FAT {
        &self.fat
    }

    pub(crate) fn read_sector(&self, sector: SectorID, buf: &mut [u8]) -> Result<(), Error> {
        let offset = self.geometry.sector_offset(sector);
        self.device.lock().wrap().read_raw(offset, buf)?;
        Ok(())
    }

    pub(crate) fn advance(&self, chain: &mut Chain) -> Result<bool, Error> {
        chain.advance(&mut self.device.lock().wrap())
    }

    fn check_supported(&self) -> Result<(), Error> {
        match self.geometry.fat_type {
            FATType::ExFAT => Err(ImplementationError::ExFAT.into()),
            _ => Ok(()),
        }
    }

    pub(crate) fn entries(&self, directory: DirectoryLocation) -> EntryIter<'_, D> {
        EntryIter::new(self, directory)
    }

    fn find(
        &self,
        directory: DirectoryLocation,
        segment: &str,
        short: Option<&ShortName>,
    ) -> Result<Option<DirEntry>, Error> {
        for entry in self.entries(directory) {
            let entry = entry?;
            if entry.matches(segment, short) {
                return Ok(Some(entry));
            }
        }
        Ok(None)
    }

    /// Resolve `path` relative to `directory`, one segment per level.
    pub fn traverse_path(&self, path: &str, directory: DirectoryLocation) -> Result<DirEntry, Error> {
        self.check_supported()?;
        let path = path.trim_start_matches('/');
        let (segment, rest) = path.split_once('/').unwrap_or((path, ""));
        if segment.is_empty() {
            return Err(InputError::InvalidPath.into());
        }
        let short = match ShortName::translate(segment) {
            Ok(name) => Some(name),
            Err(_) => {
                trace!("{} has no 8.3 form, matching long names only", segment);
                None
            }
        };
        let entry = match self.find(directory, segment, short.as_ref())? {
            Some(entry) => entry,
            None if short.is_none() => return Err(InputError::FilenameTranslation.into()),
            None => {
                debug!("{} not found", segment);
                return Err(OperationError::NotFound.into());
            }
        };
        let rest = rest.trim_start_matches('/');
        if rest.is_empty() {
            return Ok(entry);
        }
        if !entry.is_directory() {
            debug!("{} is not a directory", segment);
            return Err(OperationError::NotADirectory.into());
        }
        self.traverse_path(rest, self.geometry.directory(entry.first_cluster()))
    }

    /// List a directory, `/` being the root
    pub fn read_dir(&self, path: &str) -> Result<Vec<DirEntry>, Error> {
        self.check_supported()?;
        let directory = match path.trim_matches('/') {
            "" => self.geometry.root(),
            path => {
                let entry = self.traverse_path(path, self.geometry.root())?;
                if !entry.is_directory() {
                    return Err(OperationError::NotADirectory.into());
                }
                self.geometry.directory(entry.first_cluster())
            }
        };
        self.entries(directory).collect()
    }

    /// Visit the device byte ranges backing `length` bytes of the chain
    /// starting at `first`, beginning `offset` bytes in.
    fn for_each_extent<F>(&self, first: ClusterID, offset: u64, length: usize, mut f: F) -> Result<(), Error>
    where
        F: FnMut(&mut dyn RawIO, u64, Range<usize>) -> Result<(), Error>,
    {
        if !self.geometry.contains(first) {
            warn!("File data at cluster {} outside the data region", first);
            return Err(DataError::ClusterChain.into());
        }
        let cluster_size = self.geometry.cluster_size() as u64;
        let mut chain = self.fat.chain(first);
        let mut io = self.device.lock().wrap();
        for _ in 0..offset / cluster_size {
            if !chain.advance(&mut io)? {
                return Err(DataError::ClusterChain.into());
            }
        }
        let mut within = offset % cluster_size;
        let mut done = 0;
        while done < length {
            let chunk = (cluster_size - within).min((length - done) as u64) as usize;
            let position = self.geometry.cluster_offset(chain.current()) + within;
            f(&mut io, position, done..done + chunk)?;
            done += chunk;
            within = 0;
            if done < length && !chain.advance(&mut io)? {
                warn!("Cluster chain at {} shorter than the file", first);
                return Err(DataError::ClusterChain.into());
            }
        }
        Ok(())
    }

    /// Read file data, clamped to `size`
    pub fn read_file(&self, first: ClusterID, size: u64, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        if offset >= size || buf.is_empty() {
            return Ok(0);
        }
        let length = (buf.len() as u64).min(size - offset) as usize;
        self.for_each_extent(first, offset, length, |io, position, range| {
            io.read_raw(position, &mut buf[range])?;
            Ok(())
        })?;
        Ok(length)
    }

    /// Overwrite existing file data in place, the file never grows
    pub fn write_file(&self, first: ClusterID, size: u64, offset: u64, data: &[u8]) -> Result<usize, Error> {
        if offset.checked_add(data.len() as u64).map_or(true, |end| end > size) {
            debug!("Write of {} bytes at {} beyond file size {}", data.len(), offset, size);
            return Err(ImplementationError::WriteExtend.into());
        }
        if data.is_empty() {
            return Ok(0);
        }
        self.for_each_extent(first, offset, data.len(), |io, position, range| {
            io.write_raw(position, &data[range])?;
            Ok(())
        })?;
        self.device.lock().wrap().flush()?;
        Ok(data.len())
    }
}

fn first_cluster(file: &FileMetadata) -> Result<ClusterID, Error> {
    match file.locator() {
        Locator::Cluster { first, .. } => Ok(first),
        Locator::Slot(_) => Err(OperationError::InvalidHandle.into()),
    }
}

impl<D: BlockDevice + Send + 'static> FilesystemDriver for FatDriver<D> {
    fn name(&self) -> &str {
        "fat"
    }

    fn open(self: Arc<Self>, path: &str) -> Result<FileMetadata, Error> {
        let entry = self.traverse_path(path, self.geometry.root())?;
        let first = entry.first_cluster();
        let byte_offset = match self.geometry.contains(first) {
            true => self.geometry.cluster_offset(first),
            false => 0,
        };
        let name: String = entry.name();
        let locator = Locator::Cluster { first, byte_offset };
        let size = entry.size() as u64;
        trace!("Open {} at cluster {} size {}", name, first, size);
        let device: Arc<dyn StorageDevice> = self.clone();
        Ok(FileMetadata::new(name, self, device, size, locator, entry.attributes()))
    }
}

impl<D: BlockDevice + Send + 'static> StorageDevice for FatDriver<D> {
    fn read(&self, file: &FileMetadata, offset: u64, buf: &mut [u8]) -> Result<usize, Error> {
        self.read_file(first_cluster(file)?, file.size(), offset, buf)
    }

    fn write(&self, file: &FileMetadata, offset: u64, data: &[u8]) -> Result<usize, Error> {
        self.write_file(first_cluster(file)?, file.size(), offset, data)
    }
}

#[cfg(test)]
mod test {
    use alloc::sync::Arc;
    use alloc::vec::Vec;
    use alloc::{format, vec};

    use super::FatDriver;
    use crate::driver::FilesystemDriver;
    use crate::endian::put_le;
    use crate::error::{DataError, Error, ImplementationError, InputError, OperationError};
    use crate::file::Locator;
    use crate::image::{self, Image, Layout};
    use crate::io::MemoryDevice;
    use crate::region::boot::FATType;

    const HELLO: &[u8] = b"hello world";

    /// /
    /// |- A/          cluster 3, long name "Alpha Directory"
    /// |  |- .  ..
    /// |  `- B.TXT    cluster 5, "hello world"
    /// |- README.TXT  cluster 4, 1200 bytes over clusters 4 -> 9 -> 6
    /// `- EMPTY.TXT   no clusters
    fn sample_image(layout: Layout) -> Image {
        let mut image = Image::new(layout);
        let mut root = vec![image::volume_label(b"TESTVOLUME ")];
        root.extend(image::long_name("Alpha Directory"));
        root.push(image::directory(b"A          ", 3));
        root.push(image::file(b"README  TXT", 4, 1200));
        root.push(image::file(b"EMPTY   TXT", 0, 0));
        image.write_root(&root);
        image.chain(&[3]);
        image.write_directory(3, &[
            image::directory(b".          ", 3),
            image::directory(b"..         ", 0),
            image::file(b"B       TXT", 5, HELLO.len() as u32),
        ]);
        image.chain(&[5]);
        image.write_cluster(5, HELLO);
        image.chain(&[4, 9, 6]);
        let data = pattern(1200);
        image.write_cluster(4, &data[..512]);
        image.write_cluster(9, &data[512..1024]);
        image.write_cluster(6, &data[1024..]);
        image
    }

    fn pattern(length: usize) -> Vec<u8> {
        (0..length).map(|i| (i * 7 % 251) as u8).collect()
    }

    fn driver(layout: Layout) -> Arc<FatDriver<MemoryDevice>> {
        Arc::new(FatDriver::try_create(sample_image(layout).device()).unwrap())
    }

    #[test]
    fn test_nested_lookup() {
        for layout in [Layout::fat12(), Layout::fat16(), Layout::fat32()] {
            let driver = driver(layout);
            assert_eq!(driver.fat_type(), layout.fat_type);
            assert_eq!(driver.volume_label(), "TESTVOLUME");
            let file = driver.clone().open("/a/b.txt").unwrap();
            assert_eq!(file.size(), HELLO.len() as u64);
            assert_eq!(file.name(), "B.TXT");
            let mut buf = [0u8; 32];
            assert_eq!(file.read(0, &mut buf).unwrap(), HELLO.len());
            assert_eq!(&buf[..HELLO.len()], HELLO);
        }
    }

    #[test]
    fn test_lookup_errors() {
        let driver = driver(Layout::fat16());
        let not_found = Error::Operation(OperationError::NotFound);
        assert_eq!(driver.clone().open("/a/missing.txt").unwrap_err(), not_found);
        assert_eq!(driver.clone().open("/missing/b.txt").unwrap_err(), not_found);
        let not_a_directory = Error::Operation(OperationError::NotADirectory);
        assert_eq!(driver.clone().open("/readme.txt/b.txt").unwrap_err(), not_a_directory);
        let untranslatable = Error::Input(InputError::FilenameTranslation);
        assert_eq!(driver.clone().open("/no such long name.txt").unwrap_err(), untranslatable);
        assert_eq!(driver.clone().open("/").unwrap_err(), Error::Input(InputError::InvalidPath));
        // Volume labels never match a lookup
        assert_eq!(driver.clone().open("/testvolume").unwrap_err(), not_found);
    }

    #[test]
    fn test_long_name_and_parent() {
        let driver = driver(Layout::fat16());
        let directory = driver.clone().open("/alpha directory").unwrap();
        assert_eq!(directory.name(), "Alpha Directory");
        assert!(directory.attributes().directory());
        assert_eq!(directory.size(), 0);
        let file = driver.clone().open("/Alpha Directory/b.txt").unwrap();
        assert_eq!(file.size(), HELLO.len() as u64);
        let file = driver.clone().open("/a/../readme.txt").unwrap();
        assert_eq!(file.size(), 1200);
    }

    #[test]
    fn test_read_across_clusters() {
        let driver = driver(Layout::fat16());
        let file = driver.clone().open("/readme.txt").unwrap();
        let expected = pattern(1200);
        assert_eq!(file.locator(), Locator::Cluster { first: 4.into(), byte_offset: (37 + 2) * 512 });
        let mut buf = vec![0u8; 600];
        assert_eq!(file.read(500, &mut buf).unwrap(), 600);
        assert_eq!(buf, expected[500..1100]);
        // Clamped to the file size
        let mut buf = vec![0u8; 4096];
        assert_eq!(file.read(1000, &mut buf).unwrap(), 200);
        assert_eq!(buf[..200], expected[1000..]);
        assert_eq!(file.read(1200, &mut buf).unwrap(), 0);
        let empty = driver.clone().open("/empty.txt").unwrap();
        assert_eq!(empty.read(0, &mut buf).unwrap(), 0);
    }

    #[test]
    fn test_write_in_place() {
        let driver = driver(Layout::fat12());
        let file = driver.clone().open("/readme.txt").unwrap();
        let patch = [0xA5u8; 100];
        assert_eq!(file.write(480, &patch).unwrap(), 100);
        let mut buf = vec![0u8; 1200];
        assert_eq!(file.read(0, &mut buf).unwrap(), 1200);
        let mut expected = pattern(1200);
        expected[480..580].copy_from_slice(&patch);
        assert_eq!(buf, expected);
        let result = file.write(1150, &patch);
        assert_eq!(result.unwrap_err(), Error::Implementation(ImplementationError::WriteExtend));
    }

    #[test]
    fn test_read_dir() {
        let driver = driver(Layout::fat32());
        let names: Vec<_> = driver.read_dir("/").unwrap().iter().map(|e| e.name()).collect();
        assert_eq!(names, ["TESTVOLUME", "Alpha Directory", "README.TXT", "EMPTY.TXT"]);
        let entries = driver.read_dir("/a").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name()).collect();
        assert_eq!(names, [".", "..", "B.TXT"]);
        assert!(entries.iter().all(|e| e.long_name.is_empty()));
        let error = driver.read_dir("/readme.txt").unwrap_err();
        assert_eq!(error, Error::Operation(OperationError::NotADirectory));
    }

    #[test]
    fn test_directory_spanning_clusters() {
        let mut image = sample_image(Layout::fat16());
        // 16 entries fill cluster 20, the 17th lands in cluster 11
        let first: Vec<_> = (0..16).map(|i| {
            let name = format!("F{:<7}TXT", i);
            let mut bytes = [0u8; 11];
            bytes.copy_from_slice(name.as_bytes());
            image::file(&bytes, 0, 0)
        }).collect();
        image.write_directory(20, &first);
        image.write_directory(11, &[image::file(b"LAST    TXT", 5, HELLO.len() as u32)]);
        image.chain(&[20, 11]);
        image.write_root(&[image::directory(b"BIG        ", 20)]);
        let driver = Arc::new(FatDriver::try_create(image.device()).unwrap());

        let names: Vec<_> = driver.read_dir("/big").unwrap().iter().map(|e| e.name()).collect();
        assert_eq!(names.len(), 17);
        assert_eq!(names[0], "F0.TXT");
        assert_eq!(names[15], "F15.TXT");
        assert_eq!(names[16], "LAST.TXT");
        let file = driver.clone().open("/big/last.txt").unwrap();
        assert_eq!(file.size(), HELLO.len() as u64);
    }

    #[test]
    fn test_deleted_entry_skipped() {
        let mut image = Image::new(Layout::fat16());
        let mut deleted = image::file(b"GONE    TXT", 5, 1);
        deleted[0] = 0xE5;
        let mut entries = image::long_name("orphaned long name");
        entries.push(deleted);
        entries.push(image::file(b"KEPT    TXT", 6, 1));
        image.write_root(&entries);
        let driver = FatDriver::try_create(image.device()).unwrap();
        let entries = driver.read_dir("/").unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name(), "KEPT.TXT");
        assert!(entries[0].long_name.is_empty());
    }

    #[test]
    fn test_not_fat() {
        let result = FatDriver::try_create(MemoryDevice::new(vec![0u8; 4096]));
        assert_eq!(result.err(), Some(Error::Data(DataError::NotFAT)));
        assert!(Error::Data(DataError::NotFAT).is_not_found());
    }

    #[test]
    fn test_fat_beyond_volume() {
        let mut sector = vec![0u8; 512];
        put_le(&mut sector, 11, 512u16);
        sector[13] = 1;
        put_le(&mut sector, 14, 1u16);
        sector[16] = 2;
        put_le(&mut sector, 19, 100u16);
        put_le(&mut sector, 36, u32::MAX);
        sector[510..512].copy_from_slice(&hex!("55 AA"));
        let result = FatDriver::try_create(MemoryDevice::new(sector));
        assert_eq!(result.err(), Some(Error::Data(DataError::NotFAT)));
    }

    #[test]
    fn test_write_offset_overflow() {
        let driver = Arc::new(FatDriver::try_create(sample_image(Layout::fat16()).device()).unwrap());
        let file = driver.clone().open("/a/b.txt").unwrap();
        let error = file.write(u64::MAX, b"x").unwrap_err();
        assert_eq!(error, Error::Implementation(ImplementationError::WriteExtend));
    }

    #[test]
    fn test_exfat_detected() {
        let mut layout = Layout::fat16();
        layout.clusters = 0;
        let driver = Arc::new(FatDriver::try_create(Image::new(layout).device()).unwrap());
        assert_eq!(driver.fat_type(), FATType::ExFAT);
        let error = driver.clone().open("/a").unwrap_err();
        assert_eq!(error, Error::Implementation(ImplementationError::ExFAT));
    }
}
