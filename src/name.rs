use core::fmt;

use crate::error::InputError;

const BASE: usize = 8;
const LENGTH: usize = 11;

/// Space padded 8.3 name exactly as stored in a directory entry
#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct ShortName([u8; LENGTH]);

impl Default for ShortName {
    fn default() -> Self {
        Self([b' '; LENGTH])
    }
}

impl From<[u8; LENGTH]> for ShortName {
    fn from(bytes: [u8; LENGTH]) -> Self {
        Self(bytes)
    }
}

impl ShortName {
    pub fn as_bytes(&self) -> &[u8; LENGTH] {
        &self.0
    }

    pub fn base(&self) -> &[u8] {
        trim(&self.0[..BASE])
    }

    pub fn extension(&self) -> &[u8] {
        trim(&self.0[BASE..])
    }

    /// Translate one path segment into its 8.3 form.
    ///
    /// Names that would need a generated short name (`~1` tails) are rejected,
    /// they can only be found through their long name.
    pub fn translate(segment: &str) -> Result<Self, InputError> {
        match segment {
            "." => return Ok(Self(*b".          ")),
            ".." => return Ok(Self(*b"..         ")),
            _ => (),
        }
        if segment.is_empty() || !segment.is_ascii() || segment.len() > 12 {
            return Err(InputError::FilenameTranslation);
        }
        let bytes = segment.as_bytes();
        let mut name = Self::default();
        if bytes.len() == 12 && bytes[BASE] == b'.' {
            name.fill(0, &bytes[..BASE]);
            name.fill(BASE, &bytes[BASE + 1..]);
            return Ok(name);
        }
        match segment.rfind('.') {
            Some(dot) if dot > BASE => return Err(InputError::FilenameTranslation),
            Some(dot) => {
                name.fill(0, &bytes[..dot]);
                let extension = &bytes[dot + 1..];
                name.fill(BASE, &extension[..extension.len().min(3)]);
            }
            None if bytes.len() > LENGTH => return Err(InputError::FilenameTranslation),
            None => name.fill(0, bytes),
        }
        Ok(name)
    }

    fn fill(&mut self, at: usize, bytes: &[u8]) {
        for (dest, src) in self.0[at..].iter_mut().zip(bytes) {
            *dest = src.to_ascii_uppercase();
        }
    }
}

fn trim(bytes: &[u8]) -> &[u8] {
    let end = bytes.iter().rposition(|&b| b != b' ').map_or(0, |i| i + 1);
    &bytes[..end]
}

impl fmt::Display for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in self.base() {
            write!(f, "{}", byte as char)?;
        }
        let extension = self.extension();
        if !extension.is_empty() {
            write!(f, ".")?;
            for &byte in extension {
                write!(f, "{}", byte as char)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ShortName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ShortName({:?})", core::str::from_utf8(&self.0).unwrap_or("<binary>"))
    }
}
