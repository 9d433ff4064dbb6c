#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use image::{Rgb, RgbImage};

/// Writes a small RGB PNG; `sharp` draws a checkerboard, otherwise a flat fill.
pub fn write_png(path: &Path, width: u32, height: u32, sharp: bool) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }

    let img = RgbImage::from_fn(width, height, |x, y| {
        if sharp && (x + y) % 2 == 0 {
            Rgb([255, 255, 255])
        } else {
            Rgb([40, 80, 120])
        }
    });
    img.save(path).expect("write png file");
}

pub fn write_text(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create parent dir");
    }
    fs::write(path, content).expect("write text file");
}

/// Builds a YOLO-style dataset tree under a temporary root.
pub struct DatasetBuilder {
    root: PathBuf,
}

impl DatasetBuilder {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Adds an image and its label file to a split directory.
    pub fn pair(&self, split: &str, stem: &str, label_lines: &[&str]) -> &Self {
        let image = self.root.join(split).join("images").join(format!("{stem}.png"));
        write_png(&image, 8, 8, true);
        self.label(split, stem, label_lines)
    }

    /// Adds a label file only.
    pub fn label(&self, split: &str, stem: &str, label_lines: &[&str]) -> &Self {
        let mut content = label_lines.join("\n");
        content.push('\n');
        let label = self.root.join(split).join("labels").join(format!("{stem}.txt"));
        write_text(&label, &content);
        self
    }

    /// Adds a file with an image extension that is not a decodable image.
    pub fn broken_image(&self, split: &str, name: &str) -> &Self {
        let image = self.root.join(split).join("images").join(name);
        write_text(&image, "not an image");
        self
    }

    pub fn data_yaml(&self, content: &str) -> &Self {
        write_text(&self.root.join("data.yaml"), content);
        self
    }

    pub fn classes_txt(&self, names: &[&str]) -> &Self {
        write_text(&self.root.join("classes.txt"), &(names.join("\n") + "\n"));
        self
    }
}
