//! OpenCV boosted Haar cascade model, loaded from the `opencv_storage` XML
//! layout written by `opencv_traincascade`.
//!
//! Only the modern `<cascade>` layout with stump/tree weak classifiers over
//! upright Haar features is supported. Tilted (45°) features are rejected.

use std::fs;
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("failed to read cascade file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed cascade XML: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("cascade is missing <{0}>")]
    MissingElement(&'static str),
    #[error("invalid number in <{element}>: {value:?}")]
    InvalidNumber { element: &'static str, value: String },
    #[error("unsupported cascade: {0}")]
    Unsupported(String),
}

/// One weighted rectangle of a Haar feature, in window coordinates.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WeightedRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub weight: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HaarFeature {
    pub rects: Vec<WeightedRect>,
}

/// Split node of a weak classifier tree.
///
/// `left`/`right` > 0 index another node; <= 0 index leaf `-left`/`-right`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TreeNode {
    pub left: i32,
    pub right: i32,
    pub feature: usize,
    pub threshold: f32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WeakClassifier {
    pub nodes: Vec<TreeNode>,
    pub leaves: Vec<f32>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    pub threshold: f32,
    pub classifiers: Vec<WeakClassifier>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct HaarCascade {
    pub window_width: u32,
    pub window_height: u32,
    pub stages: Vec<Stage>,
    pub features: Vec<HaarFeature>,
}

impl HaarCascade {
    pub fn load(path: &Path) -> Result<Self, CascadeError> {
        let xml = fs::read_to_string(path)?;
        Self::from_xml(&xml)
    }

    pub fn from_xml(xml: &str) -> Result<Self, CascadeError> {
        let root = parse_tree(xml)?;
        let cascade = root
            .child("cascade")
            .ok_or(CascadeError::Unsupported(
                "expected an opencv_traincascade <cascade> element".into(),
            ))?;

        let stage_type = cascade.required_text("stageType")?;
        if stage_type != "BOOST" {
            return Err(CascadeError::Unsupported(format!("stage type {stage_type}")));
        }
        let feature_type = cascade.required_text("featureType")?;
        if feature_type != "HAAR" {
            return Err(CascadeError::Unsupported(format!(
                "feature type {feature_type}"
            )));
        }

        let window_width = parse_number(cascade.required_text("width")?, "width")?;
        let window_height = parse_number(cascade.required_text("height")?, "height")?;

        let stages = cascade
            .child("stages")
            .ok_or(CascadeError::MissingElement("stages"))?
            .items()
            .map(parse_stage)
            .collect::<Result<Vec<_>, _>>()?;

        let features = cascade
            .child("features")
            .ok_or(CascadeError::MissingElement("features"))?
            .items()
            .map(parse_feature)
            .collect::<Result<Vec<_>, _>>()?;

        let parsed = Self {
            window_width,
            window_height,
            stages,
            features,
        };
        parsed.validate()?;
        Ok(parsed)
    }

    fn validate(&self) -> Result<(), CascadeError> {
        if self.window_width < 3 || self.window_height < 3 {
            return Err(CascadeError::Unsupported(format!(
                "window {}x{} too small",
                self.window_width, self.window_height
            )));
        }
        for stage in &self.stages {
            for wc in &stage.classifiers {
                for node in &wc.nodes {
                    if node.feature >= self.features.len() {
                        return Err(CascadeError::Unsupported(format!(
                            "node references feature {} of {}",
                            node.feature,
                            self.features.len()
                        )));
                    }
                    for next in [node.left, node.right] {
                        let out_of_range = if next > 0 {
                            next as usize >= wc.nodes.len()
                        } else {
                            (-next) as usize >= wc.leaves.len()
                        };
                        if out_of_range {
                            return Err(CascadeError::Unsupported(format!(
                                "node child {next} out of range"
                            )));
                        }
                    }
                }
            }
        }
        for feature in &self.features {
            for r in &feature.rects {
                if r.x + r.width > self.window_width || r.y + r.height > self.window_height {
                    return Err(CascadeError::Unsupported(
                        "feature rectangle exceeds the detection window".into(),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn parse_stage(node: &XmlNode) -> Result<Stage, CascadeError> {
    let threshold = parse_number(node.required_text("stageThreshold")?, "stageThreshold")?;
    let classifiers = node
        .child("weakClassifiers")
        .ok_or(CascadeError::MissingElement("weakClassifiers"))?
        .items()
        .map(parse_weak_classifier)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stage {
        threshold,
        classifiers,
    })
}

fn parse_weak_classifier(node: &XmlNode) -> Result<WeakClassifier, CascadeError> {
    let raw = parse_numbers::<f64>(node.required_text("internalNodes")?, "internalNodes")?;
    if raw.is_empty() || raw.len() % 4 != 0 {
        return Err(CascadeError::Unsupported(
            "internalNodes must hold 4 values per node (categorical splits are not supported)"
                .into(),
        ));
    }
    let nodes = raw
        .chunks_exact(4)
        .map(|c| TreeNode {
            left: c[0] as i32,
            right: c[1] as i32,
            feature: c[2] as usize,
            threshold: c[3] as f32,
        })
        .collect();
    let leaves = parse_numbers(node.required_text("leafValues")?, "leafValues")?;
    Ok(WeakClassifier { nodes, leaves })
}

fn parse_feature(node: &XmlNode) -> Result<HaarFeature, CascadeError> {
    if let Some(tilted) = node.child("tilted") {
        if tilted.text.trim() != "0" {
            return Err(CascadeError::Unsupported("tilted Haar features".into()));
        }
    }
    let rects = node
        .child("rects")
        .ok_or(CascadeError::MissingElement("rects"))?
        .items()
        .map(|r| {
            let v = parse_numbers::<f64>(&r.text, "rects")?;
            if v.len() != 5 || v[..4].iter().any(|&n| n < 0.0) {
                return Err(CascadeError::InvalidNumber {
                    element: "rects",
                    value: r.text.clone(),
                });
            }
            Ok(WeightedRect {
                x: v[0] as u32,
                y: v[1] as u32,
                width: v[2] as u32,
                height: v[3] as u32,
                weight: v[4] as f32,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(HaarFeature { rects })
}

fn parse_number<T: std::str::FromStr>(text: &str, element: &'static str) -> Result<T, CascadeError> {
    let trimmed = text.trim();
    trimmed.parse().map_err(|_| CascadeError::InvalidNumber {
        element,
        value: trimmed.to_string(),
    })
}

fn parse_numbers<T: std::str::FromStr>(
    text: &str,
    element: &'static str,
) -> Result<Vec<T>, CascadeError> {
    text.split_whitespace()
        .map(|tok| parse_number(tok, element))
        .collect()
}

// ---------------------------------------------------------------------------
// Minimal element tree
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct XmlNode {
    name: String,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Sequence entries (`<_>` elements) of an OpenCV storage list.
    fn items(&self) -> impl Iterator<Item = &XmlNode> {
        self.children.iter().filter(|c| c.name == "_")
    }

    fn required_text(&self, name: &'static str) -> Result<&str, CascadeError> {
        self.child(name)
            .map(|c| c.text.as_str())
            .ok_or(CascadeError::MissingElement(name))
    }
}

/// Parses the document into a tree rooted at its top-level element.
fn parse_tree(xml: &str) -> Result<XmlNode, CascadeError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut stack: Vec<XmlNode> = vec![XmlNode::default()];
    loop {
        match reader.read_event()? {
            Event::Start(e) => stack.push(XmlNode {
                name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                ..XmlNode::default()
            }),
            Event::Empty(e) => {
                let node = XmlNode {
                    name: String::from_utf8_lossy(e.name().as_ref()).into_owned(),
                    ..XmlNode::default()
                };
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(node);
                }
            }
            Event::Text(t) => {
                if let Some(current) = stack.last_mut() {
                    if !current.text.is_empty() {
                        current.text.push(' ');
                    }
                    current.text.push_str(&t.unescape()?);
                }
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or(CascadeError::Unsupported("unbalanced XML".into()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => return Err(CascadeError::Unsupported("unbalanced XML".into())),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let document = stack
        .pop()
        .filter(|_| stack.is_empty())
        .ok_or(CascadeError::Unsupported("unterminated XML element".into()))?;
    document
        .children
        .into_iter()
        .next()
        .ok_or(CascadeError::MissingElement("opencv_storage"))
}
