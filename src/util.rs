use std::io;
use std::fs::File;
use std::path::Path;

use memmap2::Mmap;

/// Maps the whole file read-only.
#[inline]
#[cfg_attr(feature = "dbg", track_caller)]
pub fn read_file<P>(path: P) -> io::Result::<Mmap>
where
    P: AsRef::<Path>
{
    let file = File::open(path)?;
    // SAFETY: the map is only read, and only while the run is in progress.
    unsafe { Mmap::map(&file) }
}
