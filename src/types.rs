use derive_more::{Display, From, Into};

#[derive(Copy, Clone, Debug, Default, Display, From, Into, Eq, Ord, PartialOrd, PartialEq)]
pub struct SectorID(u64);

impl<I: Into<u64>> core::ops::Add<I> for SectorID {
    type Output = Self;

    fn add(self, rhs: I) -> Self {
        Self(self.0 + rhs.into())
    }
}

impl<I: Into<u64>> core::ops::AddAssign<I> for SectorID {
    fn add_assign(&mut self, rhs: I) {
        self.0 += rhs.into()
    }
}

/// Cluster index as stored in directory entries and the FAT.
/// Clusters 0 and 1 are reserved, the data region starts at cluster 2.
#[derive(Copy, Clone, Debug, Default, Display, From, Into, Eq, Ord, PartialOrd, PartialEq, Hash)]
pub struct ClusterID(u32);

impl ClusterID {
    pub(crate) const FIRST: Self = Self(2);

    pub fn valid(&self) -> bool {
        self.0 >= Self::FIRST.0
    }

    /// Index relative to the start of the data region
    pub(crate) fn offset(self) -> u32 {
        self.0 - Self::FIRST.0
    }
}

impl<I: Into<u32>> core::ops::Add<I> for ClusterID {
    type Output = Self;

    fn add(self, rhs: I) -> Self {
        Self(self.0 + rhs.into())
    }
}
