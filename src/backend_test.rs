use super::*;

#[test]
fn export_format_parses_case_insensitively() {
    assert_eq!("PDF".parse::<ExportFormat>().expect("parse"), ExportFormat::Pdf);
    assert_eq!(" svg ".parse::<ExportFormat>().expect("parse"), ExportFormat::Svg);

    let err = "jpeg".parse::<ExportFormat>().unwrap_err();
    assert!(matches!(err, BackendError::UnknownFormat(ref name) if name == "jpeg"));
    assert_eq!(err.error_code(), "E_UNKNOWN_FORMAT");
}

#[test]
fn export_format_names() {
    assert_eq!(ExportFormat::Png.to_string(), "png");
    assert_eq!(ExportFormat::Pdf.mime_type(), "application/pdf");
    assert_eq!(ExportFormat::Svg.mime_type(), "image/svg+xml");
}

#[test]
fn dpi_resolves_against_figure() {
    assert!((Dpi::Figure.resolve(72.0) - 72.0).abs() < f64::EPSILON);
    assert!((Dpi::Value(150.0).resolve(72.0) - 150.0).abs() < f64::EPSILON);
}

#[test]
fn geometry_bbox_uses_nominal_dpi() {
    let geometry = FigureGeometry { width_in: 6.4, height_in: 4.8, dpi: 100.0 };
    let (w, h) = geometry.bbox();
    assert!((w - 640.0).abs() < 1e-9);
    assert!((h - 480.0).abs() < 1e-9);
}

#[test]
fn raster_rejects_wrong_buffer_length() {
    let err = Raster::new(2, 2, vec![0; 15]).unwrap_err();
    assert!(matches!(err, BackendError::RasterShape { width: 2, height: 2, len: 15 }));
}

#[test]
fn raster_pixel_access() {
    let mut raster = Raster::filled(3, 2, [255, 255, 255, 255]);
    assert!(!raster.has_transparency());

    raster.set_pixel(2, 1, [1, 2, 3, 128]);
    assert_eq!(raster.pixel(2, 1), Some([1, 2, 3, 128]));
    assert_eq!(raster.pixel(3, 0), None);
    assert!(raster.has_transparency());

    // Out of range writes are dropped.
    raster.set_pixel(9, 9, [0, 0, 0, 0]);
    assert_eq!(raster.pixels().len(), 3 * 2 * 4);
}

#[test]
fn raster_shape_comparison() {
    let a = Raster::filled(4, 4, [0, 0, 0, 255]);
    let b = Raster::filled(4, 4, [9, 9, 9, 255]);
    let c = Raster::filled(4, 5, [0, 0, 0, 255]);
    assert!(a.same_shape(&b));
    assert!(!a.same_shape(&c));
}

#[test]
fn default_capabilities_png_only() {
    let caps = RenderCapabilities::default();
    assert!(caps.decodes_browser_keys);
    assert!(caps.supports(ExportFormat::Png));
    assert!(!caps.supports(ExportFormat::Pgf));
}
