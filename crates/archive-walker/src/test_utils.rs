//! Archive builders shared by the tests of this crate and its dependents.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
pub use zip::CompressionMethod;

const LOCAL_HEADER: u32 = 0x04034b50;
const CENTRAL_HEADER: u32 = 0x02014b50;
const END_OF_CENTRAL_DIRECTORY: u32 = 0x06054b50;
const DATA_DESCRIPTOR: u32 = 0x08074b50;
const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;
const FLAG_UTF8: u16 = 1 << 11;

#[derive(Debug, Clone, Copy)]
pub enum Item<'a> {
    File(&'a str, &'a [u8]),
    Dir(&'a str),
}

pub fn zip_archive(items: &[Item], method: CompressionMethod) -> Vec<u8> {
    let options = SimpleFileOptions::default().compression_method(method);
    let mut writer = zip::ZipWriter::new(Cursor::new(vec![]));
    for item in items {
        match item {
            Item::File(name, data) => {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
            Item::Dir(name) => writer.add_directory(*name, options).unwrap(),
        }
    }
    writer.finish().unwrap().into_inner()
}

/// Builds a deflated archive laid out the way `jar cf` and `ZipOutputStream`
/// write one: every local header carries flags `0x0808`, zero sizes and a zero
/// crc, and the real values follow the entry data in a data descriptor.
pub fn jar_archive(items: &[Item]) -> Vec<u8> {
    with_data_descriptors(&zip_archive(items, CompressionMethod::Deflated))
}

fn u16_at(data: &[u8], offset: usize) -> u16 {
    u16::from_le_bytes([data[offset], data[offset + 1]])
}

fn u32_at(data: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes(data[offset..offset + 4].try_into().unwrap())
}

fn put_u16(data: &mut [u8], offset: usize, value: u16) {
    data[offset..offset + 2].copy_from_slice(&value.to_le_bytes());
}

fn put_u32(data: &mut [u8], offset: usize, value: u32) {
    data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
}

/// Rewrites a seekable-writer archive so that every entry defers its crc and
/// sizes to a trailing data descriptor. Expects no archive comment and no zip64
/// records.
pub fn with_data_descriptors(archive: &[u8]) -> Vec<u8> {
    let eocd = archive.len() - 22;
    assert_eq!(u32_at(archive, eocd), END_OF_CENTRAL_DIRECTORY);
    let entries = u16_at(archive, eocd + 10) as usize;
    let mut central = u32_at(archive, eocd + 16) as usize;

    let mut out = Vec::with_capacity(archive.len() + entries * 16);
    let mut directory = Vec::new();
    for _ in 0..entries {
        assert_eq!(u32_at(archive, central), CENTRAL_HEADER);
        let crc = u32_at(archive, central + 16);
        let compressed = u32_at(archive, central + 20);
        let uncompressed = u32_at(archive, central + 24);
        let central_len = 46
            + u16_at(archive, central + 28) as usize
            + u16_at(archive, central + 30) as usize
            + u16_at(archive, central + 32) as usize;
        let local = u32_at(archive, central + 42) as usize;
        assert_eq!(u32_at(archive, local), LOCAL_HEADER);
        let local_len =
            30 + u16_at(archive, local + 26) as usize + u16_at(archive, local + 28) as usize;

        let mut header = archive[local..local + local_len].to_vec();
        let flags = u16_at(&header, 6) | FLAG_DATA_DESCRIPTOR | FLAG_UTF8;
        put_u16(&mut header, 6, flags);
        header[14..26].fill(0);

        let mut record = archive[central..central + central_len].to_vec();
        put_u16(&mut record, 8, flags);
        put_u32(&mut record, 42, out.len() as u32);
        directory.extend_from_slice(&record);

        out.extend_from_slice(&header);
        let data = local + local_len;
        out.extend_from_slice(&archive[data..data + compressed as usize]);
        for value in [DATA_DESCRIPTOR, crc, compressed, uncompressed] {
            out.extend_from_slice(&value.to_le_bytes());
        }
        central += central_len;
    }

    let mut end = archive[eocd..].to_vec();
    put_u32(&mut end, 12, directory.len() as u32);
    put_u32(&mut end, 16, out.len() as u32);
    out.extend_from_slice(&directory);
    out.extend_from_slice(&end);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_jar_archive_uses_data_descriptors() {
        let data = jar_archive(&[Item::File("a/b/C.class", b"\xca\xfe\xba\xbe")]);
        assert_eq!(u16_at(&data, 6), 0x0808);
        assert_eq!(u16_at(&data, 8), 8);
        assert_eq!(&data[14..26], &[0; 12]);

        let mut archive = zip::ZipArchive::new(Cursor::new(data.clone())).unwrap();
        let mut content = vec![];
        archive.by_index(0).unwrap().read_to_end(&mut content).unwrap();
        assert_eq!(content, b"\xca\xfe\xba\xbe");

        // The forward-only reader cannot size such entries.
        assert!(zip::read::read_zipfile_from_stream(&mut Cursor::new(data)).is_err());
    }
}
