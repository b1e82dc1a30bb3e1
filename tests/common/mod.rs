#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub fn bmp_bytes(width: u32, height: u32) -> Vec<u8> {
    let row_stride = (width * 3).div_ceil(4) * 4;
    let pixel_array_size = row_stride * height;
    let file_size = 54 + pixel_array_size;

    let mut bytes = Vec::with_capacity(file_size as usize);
    bytes.extend_from_slice(b"BM");
    bytes.extend_from_slice(&file_size.to_le_bytes());
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes.extend_from_slice(&54u32.to_le_bytes());

    bytes.extend_from_slice(&40u32.to_le_bytes());
    bytes.extend_from_slice(&(width as i32).to_le_bytes());
    bytes.extend_from_slice(&(height as i32).to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&24u16.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&pixel_array_size.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&2835u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());

    bytes.resize(file_size as usize, 0);
    bytes
}

pub fn write_bmp(path: &Path, width: u32, height: u32) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, bmp_bytes(width, height)).expect("write bmp file");
}

/// A source dataset laid out as `<root>/source/{images,bbox}` with manifests
/// next to it.
pub struct SourceFixture {
    pub root: PathBuf,
}

impl SourceFixture {
    pub fn new(base: &Path) -> Self {
        let root = base.join("source");
        fs::create_dir_all(root.join("images")).expect("create images dir");
        fs::create_dir_all(root.join("bbox")).expect("create bbox dir");
        Self { root }
    }

    /// Adds an image of the given size with the given annotation rows
    /// (`class_name, xmin, ymin, xmax, ymax`).
    pub fn add_item(&self, id: &str, width: u32, height: u32, rows: &[(&str, i64, i64, i64, i64)]) {
        write_bmp(&self.root.join("images").join(format!("{id}.bmp")), width, height);
        self.write_annotation(id, rows);
    }

    pub fn write_annotation(&self, id: &str, rows: &[(&str, i64, i64, i64, i64)]) {
        let mut csv = String::from("class_name,xmin,ymin,xmax,ymax\n");
        for (name, xmin, ymin, xmax, ymax) in rows {
            csv.push_str(&format!("{name},{xmin},{ymin},{xmax},{ymax}\n"));
        }
        fs::write(self.root.join("bbox").join(format!("{id}.csv")), csv)
            .expect("write annotation csv");
    }

    pub fn write_manifest(&self, name: &str, ids: &[&str]) -> PathBuf {
        let path = self.root.parent().expect("fixture parent").join(name);
        let mut contents = ids.join("\n");
        contents.push('\n');
        fs::write(&path, contents).expect("write manifest");
        path
    }
}

pub fn read_label(out: &Path, split: &str, id: &str) -> String {
    fs::read_to_string(out.join("labels").join(split).join(format!("{id}.txt")))
        .expect("read label file")
}
