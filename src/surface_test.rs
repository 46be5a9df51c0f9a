use super::*;

const WHITE: [u8; 4] = [255, 255, 255, 255];

fn marked(width: u32, height: u32, x: u32, y: u32) -> Raster {
    let mut raster = Raster::filled(width, height, WHITE);
    raster.set_pixel(x, y, [10, 20, 30, 255]);
    raster
}

#[test]
fn first_frame_is_full() {
    let mut surface = RenderSurface::new();
    let frame = surface.encode_frame(Raster::filled(4, 3, WHITE)).expect("encode");
    assert_eq!(frame.mode, ImageMode::Full);
    assert!(!frame.mode_changed);
    assert_eq!(decode_png(&frame.png).expect("decode"), Raster::filled(4, 3, WHITE));
}

#[test]
fn same_shape_opaque_frames_are_diffs() {
    let mut surface = RenderSurface::new();
    surface.encode_frame(Raster::filled(4, 3, WHITE)).expect("encode");

    let frame = surface.encode_frame(marked(4, 3, 1, 2)).expect("encode");
    assert_eq!(frame.mode, ImageMode::Diff);
    assert!(frame.mode_changed);

    let diff = decode_png(&frame.png).expect("decode");
    assert_eq!(diff.pixel(1, 2), Some([10, 20, 30, 255]));
    assert_eq!(diff.pixel(0, 0), Some([0, 0, 0, 0]));
}

#[test]
fn shape_change_forces_full() {
    let mut surface = RenderSurface::new();
    surface.encode_frame(Raster::filled(4, 3, WHITE)).expect("encode");
    let frame = surface.encode_frame(Raster::filled(5, 3, WHITE)).expect("encode");
    assert_eq!(frame.mode, ImageMode::Full);
}

#[test]
fn requested_full_frame_applies_once() {
    let mut surface = RenderSurface::new();
    surface.encode_frame(Raster::filled(2, 2, WHITE)).expect("encode");
    surface.request_full_frame();
    assert_eq!(surface.encode_frame(Raster::filled(2, 2, WHITE)).expect("encode").mode, ImageMode::Full);
    assert_eq!(surface.encode_frame(Raster::filled(2, 2, WHITE)).expect("encode").mode, ImageMode::Diff);
}

#[test]
fn transparency_ratchet_never_releases() {
    let mut surface = RenderSurface::new();
    assert!(!surface.should_force_full_frame(false));
    assert!(surface.should_force_full_frame(true));
    for _ in 0..5 {
        assert!(surface.should_force_full_frame(false));
    }
}

#[test]
fn transparent_frame_keeps_later_frames_full() {
    let mut surface = RenderSurface::new();
    surface.encode_frame(Raster::filled(2, 2, [255, 255, 255, 0])).expect("encode");
    for _ in 0..3 {
        let frame = surface.encode_frame(Raster::filled(2, 2, WHITE)).expect("encode");
        assert_eq!(frame.mode, ImageMode::Full);
    }
    assert_eq!(surface.image_mode(), ImageMode::Full);
}

#[test]
fn last_raster_is_the_full_frame() {
    let mut surface = RenderSurface::new();
    surface.encode_frame(Raster::filled(2, 2, WHITE)).expect("encode");
    surface.encode_frame(marked(2, 2, 0, 0)).expect("encode");
    assert_eq!(surface.last_raster(), Some(&marked(2, 2, 0, 0)));
}

#[test]
fn static_encoding_matches_png_encoder() {
    let raster = marked(3, 3, 1, 1);
    let url = encode_static(&raster).expect("encode");
    assert!(url.starts_with(PNG_DATA_URI_PREFIX));

    let payload = url.strip_prefix(PNG_DATA_URI_PREFIX).unwrap_or_default();
    let bytes = BASE64.decode(payload).expect("base64");
    assert_eq!(bytes, encode_png(&raster).expect("encode"));
}

#[test]
fn content_heuristic() {
    assert!(!has_visible_content(&Raster::filled(3, 3, WHITE)));
    assert!(!has_visible_content(&Raster::filled(3, 3, [255, 255, 255, 0])));
    assert!(has_visible_content(&marked(3, 3, 2, 2)));
}

#[test]
fn content_heuristic_on_encoded_frames() {
    let blank = encode_png(&Raster::filled(2, 2, WHITE)).expect("encode");
    assert!(!frame_has_visible_content(&blank).expect("decode"));

    let err = frame_has_visible_content(b"not a png").unwrap_err();
    assert_eq!(err.error_code(), "E_PNG_DECODE");
}
