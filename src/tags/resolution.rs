// Resolution and aspect tagging
//
// Size tags are always recomputed from the decoded dimensions; any
// pre-existing size or aspect tag is stripped first so stale values from the
// oracle or sidecars never survive.

use crate::constants::{
    RES_ASPECT_TALL, RES_ASPECT_WIDE, RES_PIXELS_ABSURD, RES_PIXELS_HIGH, RES_PIXELS_LOW,
    RES_SIDE_INCREDIBLE,
};

const SIZE_TAGS: [&str; 6] = [
    "incredibly_absurdres",
    "absurdres",
    "highres",
    "lowres",
    "wide_image",
    "tall_image",
];

/// Compute the size/aspect tags for the given pixel dimensions.
pub fn resolution_tags(width: u32, height: u32) -> Vec<&'static str> {
    let mut tags = Vec::new();
    let pixels = width as u64 * height as u64;

    if width > RES_SIDE_INCREDIBLE || height > RES_SIDE_INCREDIBLE {
        tags.push("incredibly_absurdres");
    }
    if pixels >= RES_PIXELS_ABSURD {
        tags.push("absurdres");
    } else if pixels >= RES_PIXELS_HIGH {
        tags.push("highres");
    } else if pixels <= RES_PIXELS_LOW {
        tags.push("lowres");
    }

    if height > 0 {
        let aspect = width as f64 / height as f64;
        if aspect >= RES_ASPECT_WIDE {
            tags.push("wide_image");
        } else if aspect <= RES_ASPECT_TALL {
            tags.push("tall_image");
        }
    }

    tags
}

/// Strip pre-existing size/aspect tags, then apply the recomputed set when
/// dimensions are known.
pub fn retag_resolution(tags: &mut Vec<String>, dimensions: Option<(u32, u32)>) {
    tags.retain(|t| !SIZE_TAGS.contains(&t.as_str()));

    if let Some((w, h)) = dimensions {
        tags.extend(resolution_tags(w, h).into_iter().map(String::from));
    }
}
