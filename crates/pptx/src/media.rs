//! Image loading, region selection, fitting and embedding.

use crate::package::Package;
use crate::placeholder::{self, Capability, PlaceholderRef};
use crate::relationships::{rel_types, relative_target};
use crate::slide::SlidePart;
use crate::xml::{Element, Node};
use deck_core::geometry::center_on_canvas;
use deck_core::{fit_within, Error, Rect, Result};
use image::codecs::gif::GifDecoder;
use image::{AnimationDecoder, ImageFormat, ImageReader};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// GIFs above this many bytes with more than one frame are embedded as a
/// still PNG of their first frame.
pub const DEFAULT_GIF_THRESHOLD: u64 = 4 * 1024 * 1024;

/// Canvas margin for the larger-image pass (half an inch).
pub const DEFAULT_LARGER_IMAGE_MARGIN: i64 = 457_200;

/// Resolve an image reference against the assets directory.
///
/// `/assets/x`, `assets/x` and bare `x` all resolve to `<assets_dir>/x`;
/// an absolute path that exists is used as is.
pub fn resolve_asset_path(assets_dir: &Path, reference: &str) -> PathBuf {
    let reference = reference.trim();
    let direct = Path::new(reference);
    if direct.is_absolute() && direct.exists() {
        return direct.to_path_buf();
    }
    let relative = reference
        .strip_prefix("/assets/")
        .or_else(|| reference.strip_prefix("assets/"))
        .unwrap_or_else(|| reference.trim_start_matches('/'));
    assets_dir.join(relative)
}

/// Image bytes ready to embed.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    /// File name used for the picture description.
    pub name: String,
    /// True when an animated GIF was replaced by its first frame.
    pub flattened: bool,
}

impl LoadedImage {
    /// Decode dimensions from in-memory bytes.
    pub fn from_bytes(data: Vec<u8>, name: impl Into<String>, gif_threshold: u64) -> Result<Self> {
        let format = image::guess_format(&data).map_err(|e| Error::ImageError(format!("unknown image format: {}", e)))?;
        let (width, height) = ImageReader::with_format(Cursor::new(&data), format)
            .into_dimensions()
            .map_err(|e| Error::ImageError(format!("cannot read image size: {}", e)))?;

        let mut image = Self {
            data,
            format,
            width,
            height,
            name: name.into(),
            flattened: false,
        };
        if format == ImageFormat::Gif && image.data.len() as u64 > gif_threshold && is_animated_gif(&image.data)? {
            image.flatten_gif()?;
        }
        Ok(image)
    }

    /// Read and decode an image file.
    pub fn open(path: &Path, gif_threshold: u64) -> Result<Self> {
        let data = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::from_bytes(data, name, gif_threshold)
    }

    /// Replace the GIF bytes with a PNG of the first frame, in memory.
    fn flatten_gif(&mut self) -> Result<()> {
        let first = image::load_from_memory_with_format(&self.data, ImageFormat::Gif)
            .map_err(|e| Error::ImageError(format!("cannot decode GIF frame: {}", e)))?;
        let mut png = Vec::new();
        first
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| Error::ImageError(format!("cannot encode PNG: {}", e)))?;
        log::debug!(
            "Flattened animated GIF '{}' ({} bytes) to PNG ({} bytes)",
            self.name,
            self.data.len(),
            png.len()
        );
        self.data = png;
        self.format = ImageFormat::Png;
        self.flattened = true;
        Ok(())
    }

    pub fn extension(&self) -> &'static str {
        self.format.extensions_str().first().copied().unwrap_or("bin")
    }
}

fn is_animated_gif(data: &[u8]) -> Result<bool> {
    let decoder = GifDecoder::new(Cursor::new(data)).map_err(|e| Error::ImageError(format!("bad GIF: {}", e)))?;
    Ok(decoder.into_frames().take(2).count() > 1)
}

/// Where a picture ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementTarget {
    PicturePlaceholder,
    BodyPlaceholder,
    Canvas,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePlacement {
    pub bounds: Rect,
    pub target: PlacementTarget,
    /// Package path of the embedded media part.
    pub media_part: String,
}

/// Placement knobs.
#[derive(Debug, Clone, Copy)]
pub struct PlaceOptions {
    /// Skip empty body placeholders and center on the canvas instead.
    pub prefer_centered: bool,
    /// Run the enlarge pass with this canvas margin.
    pub larger_margin: Option<i64>,
}

/// Pick the region the image goes into, with the placeholder it replaces.
fn choose_region(slide: &SlidePart, prefer_centered: bool) -> Result<Option<(PlaceholderRef, Rect, PlacementTarget)>> {
    let tree = slide.sp_tree()?;

    if let Some(picture) = placeholder::find_picture(tree) {
        if let Some(bounds) = placeholder::effective_bounds(tree, &picture, &slide.layout) {
            return Ok(Some((picture, bounds, PlacementTarget::PicturePlaceholder)));
        }
    }
    if prefer_centered {
        return Ok(None);
    }

    let largest_empty_body = placeholder::placeholders(tree)
        .into_iter()
        .filter(|p| p.capability == Capability::Body)
        .filter(|p| placeholder::shape_at(tree, p).map(placeholder::is_text_empty).unwrap_or(false))
        .filter_map(|p| {
            let bounds = placeholder::effective_bounds(tree, &p, &slide.layout)?;
            Some((p, bounds))
        })
        .max_by_key(|(_, bounds)| bounds.area());
    Ok(largest_empty_body.map(|(p, bounds)| (p, bounds, PlacementTarget::BodyPlaceholder)))
}

fn picture_element(id: i64, name: &str, rid: &str, bounds: Rect) -> Element {
    let nv_pic_pr = Element::new("p:nvPicPr")
        .with_child(
            Element::new("p:cNvPr")
                .with_attr("id", id.to_string())
                .with_attr("name", format!("Picture {}", id - 1))
                .with_attr("descr", name),
        )
        .with_child(Element::new("p:cNvPicPr").with_child(Element::new("a:picLocks").with_attr("noChangeAspect", "1")))
        .with_child(Element::new("p:nvPr"));

    let blip_fill = Element::new("p:blipFill")
        .with_child(Element::new("a:blip").with_attr("r:embed", rid))
        .with_child(Element::new("a:stretch").with_child(Element::new("a:fillRect")));

    let sp_pr = Element::new("p:spPr")
        .with_child(
            Element::new("a:xfrm")
                .with_child(
                    Element::new("a:off")
                        .with_attr("x", bounds.x.to_string())
                        .with_attr("y", bounds.y.to_string()),
                )
                .with_child(
                    Element::new("a:ext")
                        .with_attr("cx", bounds.cx.to_string())
                        .with_attr("cy", bounds.cy.to_string()),
                ),
        )
        .with_child(
            Element::new("a:prstGeom")
                .with_attr("prst", "rect")
                .with_child(Element::new("a:avLst")),
        );

    Element::new("p:pic")
        .with_child(nv_pic_pr)
        .with_child(blip_fill)
        .with_child(sp_pr)
}

/// Centered canvas placement. With a larger-image margin the picture grows
/// to fill the inset canvas when that beats its native size. Placeholder
/// regions get no such pass: their enlargement comes from the larger-image
/// layout the resolver picks.
fn canvas_bounds(image: &LoadedImage, canvas: Rect, larger_margin: Option<i64>) -> Rect {
    let centered = center_on_canvas(image.width, image.height, canvas.cx, canvas.cy);
    match larger_margin {
        Some(margin) => {
            let enlarged = fit_within(image.width, image.height, canvas.inset(margin));
            if enlarged.area() > centered.area() {
                enlarged
            } else {
                centered
            }
        }
        None => centered,
    }
}

/// Fit `image` onto the slide and embed it.
///
/// The region is the picture placeholder, else the largest empty body
/// placeholder, else the whole canvas. A placeholder used as the region is
/// removed. The picture becomes the first shape in the tree so it sits
/// behind the title.
pub fn place_image(
    package: &mut Package,
    slide: &mut SlidePart,
    image: &LoadedImage,
    canvas: Rect,
    options: PlaceOptions,
) -> Result<ImagePlacement> {
    let chosen = choose_region(slide, options.prefer_centered)?;

    let (bounds, target, replaced) = match chosen {
        Some((placeholder_ref, region, target)) => {
            (fit_within(image.width, image.height, region), target, Some(placeholder_ref))
        }
        None => (canvas_bounds(image, canvas, options.larger_margin), PlacementTarget::Canvas, None),
    };

    let media_part = package.next_part_name("ppt/media/image", &format!(".{}", image.extension()));
    package.set(&media_part, image.data.clone());
    let mut content_types = package.content_types()?;
    content_types.ensure_default(image.extension(), image.format.to_mime_type());
    package.set_content_types(&content_types)?;

    let rid = slide
        .rels
        .add(rel_types::IMAGE, &relative_target(&slide.part_name, &media_part));
    let shape_id = slide.next_shape_id();

    let tree = slide.sp_tree_mut()?;
    if let Some(replaced) = &replaced {
        if replaced.index < tree.children.len() {
            tree.children.remove(replaced.index);
        }
    }
    let insert_at = tree
        .children
        .iter()
        .position(|n| matches!(n, Node::Element(el) if el.is("grpSpPr")))
        .map(|i| i + 1)
        .unwrap_or(tree.children.len());
    tree.insert(insert_at, picture_element(shape_id, &image.name, &rid, bounds));

    log::debug!("Placed '{}' on {} at {:?} ({:?})", image.name, slide.part_name, bounds, target);
    Ok(ImagePlacement {
        bounds,
        target,
        media_part,
    })
}
