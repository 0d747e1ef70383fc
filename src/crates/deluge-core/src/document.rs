//! Session document assembly
//!
//! A Deluge song template carries a `sessionClips` container holding one
//! `instrumentClip`. That clip is used as a prototype: it is cloned once per
//! generated clip, the clone gets its own preset, color, length and note
//! rows, and the container is rebuilt from the clones.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use rand::Rng;
use tempfile::NamedTempFile;
use tracing::{debug, info};
use xmltree::{Element, EmitterConfig, XMLNode};

use crate::allocator::{ResourceAllocator, PRESET_NAMES};
use crate::clip::Clip;
use crate::error::{ConvertError, Result};

pub const SESSION_CLIPS: &str = "sessionClips";
pub const INSTRUMENT_CLIP: &str = "instrumentClip";
pub const NOTE_ROWS: &str = "noteRows";
pub const NOTE_ROW: &str = "noteRow";

/// Writes clips into a copy of a template song
#[derive(Debug, Clone)]
pub struct DocumentInjector {
    template: PathBuf,
}

impl DocumentInjector {
    pub fn new(template: impl Into<PathBuf>) -> Self {
        DocumentInjector {
            template: template.into(),
        }
    }

    pub fn template_path(&self) -> &Path {
        &self.template
    }

    /// Load the template and return the song with `clips` injected
    pub fn build<R: Rng>(
        &self,
        clips: &[Clip],
        allocator: &mut ResourceAllocator<R>,
    ) -> Result<Element> {
        check_clips(clips)?;

        let template = self.load_template()?;
        inject_clips(&template, clips, allocator)
    }

    /// Build the song and serialize it, declaration included
    pub fn render<R: Rng>(
        &self,
        clips: &[Clip],
        allocator: &mut ResourceAllocator<R>,
    ) -> Result<Vec<u8>> {
        let song = self.build(clips, allocator)?;
        serialize(&song)
    }

    /// Build the song and write it to `output`.
    ///
    /// Nothing is written unless the whole document was built, and `output`
    /// is only replaced once every byte has reached disk.
    pub fn inject<R: Rng>(
        &self,
        clips: &[Clip],
        allocator: &mut ResourceAllocator<R>,
        output: &Path,
    ) -> Result<()> {
        let bytes = self.render(clips, allocator)?;
        write_replacing(output, |file| file.write_all(&bytes))?;

        info!(
            "Successfully wrote modified XML with {} clips to {}",
            clips.len(),
            output.display()
        );
        Ok(())
    }

    fn load_template(&self) -> Result<Element> {
        let data =
            std::fs::read(&self.template).map_err(|e| ConvertError::io(&self.template, e))?;
        let root = Element::parse(data.as_slice())?;
        debug!("Loaded template {}", self.template.display());
        Ok(root)
    }
}

/// Clone `template`, replace its session clips with `clips`, and return the new song.
///
/// The allocator is reset first; every clip gets a preset and color unique
/// within this call.
pub fn inject_clips<R: Rng>(
    template: &Element,
    clips: &[Clip],
    allocator: &mut ResourceAllocator<R>,
) -> Result<Element> {
    check_clips(clips)?;

    let container = find_descendant(template, SESSION_CLIPS)
        .ok_or_else(|| ConvertError::malformed("Could not find sessionClips element"))?;
    let prototype = container
        .get_child(INSTRUMENT_CLIP)
        .ok_or_else(|| ConvertError::malformed("Could not find template instrumentClip"))?
        .clone();
    if find_descendant(&prototype, NOTE_ROWS).is_none() {
        return Err(ConvertError::malformed("Could not find noteRows"));
    }

    let mut song = template.clone();
    let container = find_descendant_mut(&mut song, SESSION_CLIPS)
        .ok_or_else(|| ConvertError::malformed("Could not find sessionClips element"))?;

    allocator.reset();
    container.children.clear();

    for clip in clips {
        let mut element = prototype.clone();
        let preset = allocator.next_preset()?;
        let color = allocator.next_color()?;

        set_attr(&mut element, "section", "0");
        set_attr(&mut element, "instrumentPresetName", preset);
        set_attr(&mut element, "colourOffset", &color.to_string());
        set_attr(&mut element, "length", &clip.length.to_string());

        let rows = find_descendant_mut(&mut element, NOTE_ROWS)
            .ok_or_else(|| ConvertError::malformed("Could not find noteRows"))?;
        rows.children.clear();

        for row in &clip.note_rows {
            let mut row_element = Element::new(NOTE_ROW);
            set_attr(&mut row_element, "y", &row.pitch.to_string());
            set_attr(&mut row_element, "noteDataWithLift", &row.note_data);
            rows.children.push(XMLNode::Element(row_element));
        }

        debug!(preset, color, length = clip.length, rows = clip.note_rows.len(), "Added clip");
        container.children.push(XMLNode::Element(element));
    }

    Ok(song)
}

/// Serialize a song with an XML declaration
pub fn serialize(song: &Element) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    let config = EmitterConfig::new()
        .perform_indent(true)
        .write_document_declaration(true);
    song.write_with_config(&mut buf, config)?;
    Ok(buf)
}

/// Write through a temporary file next to `output`, then rename it into place.
///
/// On any failure the temporary file is removed and `output` is untouched.
pub(crate) fn write_replacing<F>(output: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut File) -> std::io::Result<()>,
{
    let dir = match output.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut staged = NamedTempFile::new_in(dir).map_err(|e| ConvertError::io(output, e))?;
    write(staged.as_file_mut())
        .and_then(|()| staged.as_file().sync_all())
        .map_err(|e| ConvertError::io(output, e))?;
    staged
        .persist(output)
        .map_err(|e| ConvertError::io(output, e.error))?;
    Ok(())
}

fn check_clips(clips: &[Clip]) -> Result<()> {
    if clips.len() > PRESET_NAMES.len() {
        return Err(ConvertError::TooManyClips {
            count: clips.len(),
            max: PRESET_NAMES.len(),
        });
    }

    for (index, clip) in clips.iter().enumerate() {
        clip.validate()
            .map_err(|reason| ConvertError::InvalidClip { index, reason })?;
    }

    Ok(())
}

fn set_attr(element: &mut Element, name: &str, value: &str) {
    element.attributes.insert(name.to_string(), value.to_string());
}

/// First element named `name` below `element`, in document order
pub fn find_descendant<'a>(element: &'a Element, name: &str) -> Option<&'a Element> {
    element.children.iter().find_map(|child| match child {
        XMLNode::Element(el) if el.name == name => Some(el),
        XMLNode::Element(el) => find_descendant(el, name),
        _ => None,
    })
}

fn find_descendant_mut<'a>(element: &'a mut Element, name: &str) -> Option<&'a mut Element> {
    for child in element.children.iter_mut() {
        if let XMLNode::Element(el) = child {
            if el.name == name {
                return Some(el);
            }
            if let Some(found) = find_descendant_mut(el, name) {
                return Some(found);
            }
        }
    }
    None
}
