//! Dataset catalog: split discovery, file pairing and class names.
//!
//! The expected layout is one directory per split under an explicit root,
//! each with `images/` and `labels/` subdirectories:
//!
//! ```text
//! root/
//!   data.yaml            (optional: class names, split directory overrides)
//!   train/images/*.jpg
//!   train/labels/*.txt
//!   valid/images/...
//!   test/...
//! ```
//!
//! Discovery is bounded to the root and its direct split directories.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::LabelscopeError;
use crate::parser::MIN_TOKENS;

/// Image extensions that take part in pairing (matched case-insensitively).
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
/// Extension of label files.
pub const LABEL_EXTENSION: &str = "txt";

const DATASET_YAML_NAMES: [&str; 2] = ["data.yaml", "dataset.yaml"];
const CLASSES_TXT: &str = "classes.txt";

/// Upper bound on class lists built from ids found in the data (inferred
/// from labels or gap-filled from a `names:` mapping). Larger ids are
/// ignored and later count as out of range.
pub const MAX_INFERRED_CLASSES: usize = 10_000;

/// The three split roles, ordered the way they are processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SplitName {
    Train,
    Val,
    Test,
}

impl SplitName {
    /// All split roles in processing order.
    pub const ALL: [SplitName; 3] = [SplitName::Train, SplitName::Val, SplitName::Test];

    /// Directory names tried for this role, in preference order.
    pub fn dir_candidates(&self) -> &'static [&'static str] {
        match self {
            SplitName::Train => &["train"],
            SplitName::Val => &["val", "valid"],
            SplitName::Test => &["test"],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SplitName::Train => "train",
            SplitName::Val => "val",
            SplitName::Test => "test",
        }
    }
}

impl fmt::Display for SplitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "train" => Ok(SplitName::Train),
            "val" | "valid" | "validation" => Ok(SplitName::Val),
            "test" => Ok(SplitName::Test),
            other => Err(format!("unknown split '{other}' (expected train, val or test)")),
        }
    }
}

/// A discovered split whose `images/` and `labels/` directories both exist.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Split {
    pub name: SplitName,
    /// Directory name relative to the dataset root (e.g. `valid`).
    pub dir_name: String,
    pub images_dir: PathBuf,
    pub labels_dir: PathBuf,
}

/// A split directory that exists but is missing `images/` or `labels/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MissingSplit {
    pub name: SplitName,
    pub dir: PathBuf,
    pub missing_images: bool,
    pub missing_labels: bool,
}

/// Ordered class names; the index is the class id.
///
/// Cheap to clone and shared read-only between the catalog and every
/// consumer of parsed labels.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClassList(Arc<[String]>);

impl ClassList {
    pub fn new(names: Vec<String>) -> Self {
        Self(names.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<Vec<String>> for ClassList {
    fn from(names: Vec<String>) -> Self {
        Self::new(names)
    }
}

impl<S: Into<String>> FromIterator<S> for ClassList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter.into_iter().map(Into::into).collect())
    }
}

/// Where the class names of a catalog came from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClassSource {
    Explicit,
    DataYaml(PathBuf),
    ClassesTxt(PathBuf),
    Inferred,
}

/// Options for catalog discovery.
#[derive(Clone, Debug, Default)]
pub struct CatalogOptions {
    /// Class names supplied by the caller; overrides any class file.
    pub classes: Option<Vec<String>>,
}

/// One image and its label file, matched by file stem.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FilePair {
    /// Image file name, used as the image identifier in reports.
    pub image_name: String,
    pub image_path: PathBuf,
    pub label_path: PathBuf,
}

/// Files of a split that did not pair up.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Orphans {
    pub images: Vec<PathBuf>,
    pub labels: Vec<PathBuf>,
}

/// Valid splits and class names of one dataset root.
#[derive(Clone, Debug)]
pub struct DatasetCatalog {
    pub root: PathBuf,
    /// Valid splits in processing order.
    pub splits: Vec<Split>,
    /// Split directories excluded because a subdirectory is missing.
    pub missing: Vec<MissingSplit>,
    pub classes: ClassList,
    pub class_source: ClassSource,
}

impl DatasetCatalog {
    /// Discover the splits and class list of a dataset root.
    ///
    /// Only an unusable root is an error. A root without any valid split
    /// yields an empty catalog.
    pub fn discover(root: &Path, opts: &CatalogOptions) -> Result<Self, LabelscopeError> {
        if !root.is_dir() {
            return Err(LabelscopeError::DatasetRootInvalid {
                path: root.to_path_buf(),
                message: "dataset root must be a directory".to_string(),
            });
        }
        fs::read_dir(root).map_err(|err| LabelscopeError::DatasetRootInvalid {
            path: root.to_path_buf(),
            message: format!("cannot read directory: {err}"),
        })?;

        let dataset_yaml = read_dataset_yaml(root)?;

        let mut splits = Vec::new();
        let mut missing = Vec::new();

        for name in SplitName::ALL {
            let override_dir = dataset_yaml
                .as_ref()
                .and_then(|(_, yaml)| yaml.split_dir(name));

            let candidates: Vec<PathBuf> = match override_dir {
                Some(rel) => vec![resolve_split_dir(root, &rel)],
                None => name
                    .dir_candidates()
                    .iter()
                    .map(|candidate| root.join(candidate))
                    .collect(),
            };

            for dir in candidates {
                if !dir.is_dir() {
                    continue;
                }

                let images_dir = dir.join("images");
                let labels_dir = dir.join("labels");
                let has_images = images_dir.is_dir();
                let has_labels = labels_dir.is_dir();

                if has_images && has_labels {
                    splits.push(Split {
                        name,
                        dir_name: rel_string(root, &dir),
                        images_dir,
                        labels_dir,
                    });
                    break;
                }

                warn!(
                    "excluding split directory {}: missing {}",
                    dir.display(),
                    match (has_images, has_labels) {
                        (false, false) => "images/ and labels/",
                        (false, true) => "images/",
                        _ => "labels/",
                    }
                );
                missing.push(MissingSplit {
                    name,
                    dir,
                    missing_images: !has_images,
                    missing_labels: !has_labels,
                });
            }
        }

        let (classes, class_source) = match (&opts.classes, dataset_yaml) {
            (Some(names), _) => (ClassList::new(names.clone()), ClassSource::Explicit),
            (None, Some((path, yaml))) if yaml.names.is_some() => {
                (ClassList::new(yaml.class_names()), ClassSource::DataYaml(path))
            }
            _ => {
                let classes_txt = root.join(CLASSES_TXT);
                if classes_txt.is_file() {
                    (
                        read_classes_txt(&classes_txt)?,
                        ClassSource::ClassesTxt(classes_txt),
                    )
                } else {
                    (infer_class_list(&splits), ClassSource::Inferred)
                }
            }
        };

        info!(
            "discovered {} split(s) and {} class(es) under {}",
            splits.len(),
            classes.len(),
            root.display()
        );

        Ok(Self {
            root: root.to_path_buf(),
            splits,
            missing,
            classes,
            class_source,
        })
    }

    /// Returns true if no valid split was found.
    pub fn is_empty(&self) -> bool {
        self.splits.is_empty()
    }

    /// Image/label pairs of a split, sorted by image file name.
    ///
    /// Images without a label file and label files without an image are
    /// left out.
    pub fn pairs(&self, split: &Split) -> Result<Vec<FilePair>, LabelscopeError> {
        Ok(pair_split(split)?.0)
    }

    /// Pairs of a split together with the files that have no counterpart,
    /// from a single listing of both directories.
    pub fn pairs_and_orphans(
        &self,
        split: &Split,
    ) -> Result<(Vec<FilePair>, Orphans), LabelscopeError> {
        pair_split(split)
    }
}

fn pair_split(split: &Split) -> Result<(Vec<FilePair>, Orphans), LabelscopeError> {
    let image_files = list_files_with_extensions(&split.images_dir, &IMAGE_EXTENSIONS)?;
    let label_files = list_files_with_extensions(&split.labels_dir, &[LABEL_EXTENSION])?;

    let mut labels_by_stem: BTreeMap<String, PathBuf> = label_files
        .into_iter()
        .filter_map(|path| file_stem(&path).map(|stem| (stem, path)))
        .collect();

    let mut pairs = Vec::new();
    let mut orphans = Orphans::default();
    let mut used_stems = BTreeSet::new();

    for image_path in image_files {
        let Some(stem) = file_stem(&image_path) else {
            orphans.images.push(image_path);
            continue;
        };

        if used_stems.contains(&stem) {
            // A second image with the same stem; the first by name keeps the label.
            orphans.images.push(image_path);
            continue;
        }

        match labels_by_stem.remove(&stem) {
            Some(label_path) => {
                used_stems.insert(stem);
                pairs.push(FilePair {
                    image_name: file_name(&image_path),
                    image_path,
                    label_path,
                });
            }
            None => orphans.images.push(image_path),
        }
    }

    orphans.labels = labels_by_stem.into_values().collect();

    Ok((pairs, orphans))
}

/// List regular files directly inside `dir` with one of the given extensions,
/// sorted by file name.
pub(crate) fn list_files_with_extensions(
    dir: &Path,
    extensions: &[&str],
) -> Result<Vec<PathBuf>, LabelscopeError> {
    let mut files = Vec::new();

    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| LabelscopeError::DirectoryWalk {
            path: dir.to_path_buf(),
            source,
        })?;

        if entry.file_type().is_file() && has_extension(entry.path(), extensions) {
            files.push(entry.path().to_path_buf());
        }
    }

    Ok(files)
}

fn has_extension(path: &Path, allowed: &[&str]) -> bool {
    let Some(ext) = path.extension().and_then(|ext| ext.to_str()) else {
        return false;
    };

    allowed
        .iter()
        .any(|allowed_ext| ext.eq_ignore_ascii_case(allowed_ext))
}

fn file_stem(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn rel_string(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.to_string_lossy().replace('\\', "/")
}

/// Resolve a split directory named in a dataset YAML.
///
/// Ultralytics files usually point at the images folder (`train/images`);
/// such entries resolve to the split directory above it.
fn resolve_split_dir(root: &Path, rel: &str) -> PathBuf {
    let joined = root.join(rel);
    let ends_with_images = matches!(
        joined.components().next_back(),
        Some(Component::Normal(last)) if last.eq_ignore_ascii_case("images")
    );

    match (ends_with_images, joined.parent()) {
        (true, Some(parent)) => parent.to_path_buf(),
        _ => joined,
    }
}

#[derive(Debug, Default, Deserialize)]
struct DatasetYaml {
    #[serde(default)]
    names: Option<DataYamlNames>,
    #[serde(default)]
    train: Option<serde_yaml::Value>,
    #[serde(default)]
    val: Option<serde_yaml::Value>,
    #[serde(default)]
    test: Option<serde_yaml::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DataYamlNames {
    Sequence(Vec<String>),
    Mapping(BTreeMap<usize, String>),
}

impl DatasetYaml {
    /// Split directory override for a role; only plain strings count.
    fn split_dir(&self, name: SplitName) -> Option<String> {
        let value = match name {
            SplitName::Train => self.train.as_ref(),
            SplitName::Val => self.val.as_ref(),
            SplitName::Test => self.test.as_ref(),
        }?;

        value
            .as_str()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    fn class_names(&self) -> Vec<String> {
        match &self.names {
            None => Vec::new(),
            Some(DataYamlNames::Sequence(names)) => names.clone(),
            Some(DataYamlNames::Mapping(mapping)) => {
                let dropped = mapping.range(MAX_INFERRED_CLASSES..).count();
                if dropped > 0 {
                    warn!(
                        "ignoring {dropped} class name(s) with an index of \
                         {MAX_INFERRED_CLASSES} or more"
                    );
                }
                let Some((&max_index, _)) = mapping.range(..MAX_INFERRED_CLASSES).next_back()
                else {
                    return Vec::new();
                };
                (0..=max_index)
                    .map(|idx| match mapping.get(&idx) {
                        Some(name) if !name.trim().is_empty() => name.clone(),
                        _ => format!("class_{idx}"),
                    })
                    .collect()
            }
        }
    }
}

fn read_dataset_yaml(root: &Path) -> Result<Option<(PathBuf, DatasetYaml)>, LabelscopeError> {
    for file_name in DATASET_YAML_NAMES {
        let path = root.join(file_name);
        if !path.is_file() {
            continue;
        }

        let data = fs::read_to_string(&path)?;
        let parsed: DatasetYaml =
            serde_yaml::from_str(&data).map_err(|source| LabelscopeError::DataYamlParse {
                path: path.clone(),
                source,
            })?;
        return Ok(Some((path, parsed)));
    }

    Ok(None)
}

fn read_classes_txt(path: &Path) -> Result<ClassList, LabelscopeError> {
    let data = fs::read_to_string(path)?;
    let mut names = Vec::new();

    for (line_idx, line) in data.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Err(LabelscopeError::ClassesTxtInvalid {
                path: path.to_path_buf(),
                message: format!("line {} is empty", line_idx + 1),
            });
        }
        names.push(trimmed.to_string());
    }

    Ok(ClassList::new(names))
}

/// Build `class_0..=class_max` from the largest class id in any label file.
fn infer_class_list(splits: &[Split]) -> ClassList {
    let mut max_class_id: Option<usize> = None;
    let mut ignored = 0usize;

    for split in splits {
        let label_files = match list_files_with_extensions(&split.labels_dir, &[LABEL_EXTENSION]) {
            Ok(files) => files,
            Err(err) => {
                warn!("cannot list {}: {err}", split.labels_dir.display());
                continue;
            }
        };

        for label_path in label_files {
            let Ok(content) = fs::read_to_string(&label_path) else {
                continue;
            };
            for line in content.lines() {
                let mut tokens = line.split_whitespace();
                let Some(class_token) = tokens.next() else {
                    continue;
                };
                if tokens.count() + 1 < MIN_TOKENS {
                    continue;
                }
                match class_token.parse::<usize>() {
                    Ok(class_id) if class_id < MAX_INFERRED_CLASSES => {
                        max_class_id = Some(max_class_id.map_or(class_id, |m| m.max(class_id)));
                    }
                    Ok(_) => ignored += 1,
                    Err(_) => {}
                }
            }
        }
    }

    if ignored > 0 {
        warn!(
            "ignoring {ignored} label line(s) with a class id of {MAX_INFERRED_CLASSES} or more \
             while inferring class names"
        );
    }

    match max_class_id {
        Some(max_id) => (0..=max_id).map(|id| format!("class_{id}")).collect(),
        None => ClassList::default(),
    }
}
