//! COCO format data structures and the document writer
//!
//! `CocoWriter` owns the id counters of one conversion run and accumulates
//! image and annotation records until the document is finished.

use serde::{Deserialize, Serialize};

/// COCO category information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u32,
    pub name: String,
}

impl Category {
    /// Build a category table from an ordered list of names; ids start at 0.
    pub fn table_from_names<S: AsRef<str>>(names: &[S]) -> Vec<Category> {
        names
            .iter()
            .enumerate()
            .map(|(id, name)| Category {
                id: id as u32,
                name: name.as_ref().to_string(),
            })
            .collect()
    }
}

/// COCO image information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: u32,
    pub file_name: String,
    pub width: u32,
    pub height: u32,
}

/// Segmentation payload of an annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segmentation {
    /// One flattened `[x1, y1, x2, y2, ...]` polygon per part.
    Polygons(Vec<Vec<u32>>),
    /// Compressed RLE, `size` is `[height, width]`.
    Rle { size: [u32; 2], counts: String },
}

/// COCO annotation information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub id: u32,
    pub image_id: u32,
    pub category_id: u32,
    pub segmentation: Segmentation,
    pub area: f64,
    pub bbox: [f64; 4], // [x, y, width, height]
    pub iscrowd: u32,
}

/// Complete COCO dataset structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CocoFile {
    pub images: Vec<Image>,
    pub categories: Vec<Category>,
    pub annotations: Vec<Annotation>,
}

/// Builds one COCO document, handing out image and annotation ids.
///
/// Both ids start at 1 and grow by one per record for the lifetime of the
/// writer.
#[derive(Debug)]
pub struct CocoWriter {
    next_image_id: u32,
    next_annotation_id: u32,
    file: CocoFile,
}

impl CocoWriter {
    /// Create a writer with the given category table
    pub fn new(categories: Vec<Category>) -> Self {
        Self {
            next_image_id: 1,
            next_annotation_id: 1,
            file: CocoFile {
                categories,
                ..CocoFile::default()
            },
        }
    }

    /// Add an image record and return its id
    pub fn add_image(&mut self, file_name: String, width: u32, height: u32) -> u32 {
        let id = self.next_image_id;
        self.next_image_id += 1;
        self.file.images.push(Image {
            id,
            file_name,
            width,
            height,
        });
        id
    }

    /// Add an annotation for an image previously returned by `add_image`,
    /// returning the annotation id
    pub fn add_annotation(
        &mut self,
        image_id: u32,
        category_id: u32,
        segmentation: Segmentation,
        area: f64,
        bbox: [f64; 4],
    ) -> u32 {
        debug_assert!(
            image_id >= 1 && image_id < self.next_image_id,
            "annotation must reference an existing image"
        );
        let id = self.next_annotation_id;
        self.next_annotation_id += 1;
        self.file.annotations.push(Annotation {
            id,
            image_id,
            category_id,
            segmentation,
            area,
            bbox,
            iscrowd: 0,
        });
        id
    }

    /// Look up a category id by name
    pub fn category_id(&self, name: &str) -> Option<u32> {
        self.file
            .categories
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.id)
    }

    pub fn image_count(&self) -> usize {
        self.file.images.len()
    }

    pub fn annotation_count(&self) -> usize {
        self.file.annotations.len()
    }

    /// Consume the writer and return the finished document
    pub fn finish(self) -> CocoFile {
        self.file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn writer() -> CocoWriter {
        CocoWriter::new(Category::table_from_names(&["NX", "M"]))
    }

    #[test]
    fn test_category_table() {
        let table = Category::table_from_names(&["NX", "M"]);
        assert_eq!(table[0], Category { id: 0, name: "NX".into() });
        assert_eq!(table[1], Category { id: 1, name: "M".into() });
    }

    #[test]
    fn test_ids_are_sequential_across_images() {
        let mut w = writer();
        let first = w.add_image("a.png".into(), 10, 10);
        let a1 = w.add_annotation(first, 0, Segmentation::Polygons(vec![]), 1.0, [0.0; 4]);
        let a2 = w.add_annotation(first, 0, Segmentation::Polygons(vec![]), 1.0, [0.0; 4]);
        let second = w.add_image("b.png".into(), 20, 20);
        let a3 = w.add_annotation(second, 1, Segmentation::Polygons(vec![]), 1.0, [0.0; 4]);

        assert_eq!((first, second), (1, 2));
        assert_eq!((a1, a2, a3), (1, 2, 3));

        let file = w.finish();
        assert_eq!(file.images.len(), 2);
        assert_eq!(file.annotations[2].image_id, 2);
        assert!(file.annotations.iter().all(|a| a.iscrowd == 0));
    }

    #[test]
    fn test_category_lookup() {
        let w = writer();
        assert_eq!(w.category_id("M"), Some(1));
        assert_eq!(w.category_id("car"), None);
    }

    #[test]
    fn test_serialized_layout() {
        let mut w = writer();
        let image_id = w.add_image("a.png".into(), 4, 3);
        w.add_annotation(
            image_id,
            0,
            Segmentation::Polygons(vec![vec![0, 0, 3, 0, 0, 2]]),
            3.0,
            [0.0, 0.0, 2.0, 2.0],
        );
        let value = serde_json::to_value(w.finish()).unwrap();

        assert_eq!(value["images"][0]["file_name"], "a.png");
        assert_eq!(value["categories"][1]["name"], "M");
        let ann = &value["annotations"][0];
        assert_eq!(ann["segmentation"], serde_json::json!([[0, 0, 3, 0, 0, 2]]));
        assert_eq!(ann["bbox"], serde_json::json!([0.0, 0.0, 2.0, 2.0]));
        assert_eq!(ann["area"], 3.0);
        assert_eq!(ann["iscrowd"], 0);
    }

    #[test]
    fn test_rle_segmentation_layout() {
        let seg = Segmentation::Rle {
            size: [10, 10],
            counts: "53l2".into(),
        };
        assert_eq!(
            serde_json::to_value(seg).unwrap(),
            serde_json::json!({"size": [10, 10], "counts": "53l2"})
        );
    }
}
