use super::*;
use client_core::{ProcessingError, ProcessingRequest};

fn parse(extra: &[&str]) -> Args {
    let mut argv = vec!["explorer_cli", "--image", "photo.jpg"];
    argv.extend_from_slice(extra);
    Args::try_parse_from(argv).expect("valid args")
}

#[test]
fn defaults_to_grey_world_in_auto_mode() {
    let settings = parse(&[]).explorer_settings();
    assert_eq!(settings.selected_algorithms(), &[Algorithm::GreyWorld]);
    assert_eq!(settings.color_space_mode(), ColorSpaceMode::Auto);
    assert_eq!(
        settings.effective_color_spaces(),
        (ColorSpace::Srgb, ColorSpace::LinearRgb)
    );
}

#[test]
fn repeated_algorithm_flags_keep_order() {
    let settings = parse(&["--algorithm", "grey-edge", "--algorithm", "white_patch"])
        .explorer_settings();
    assert_eq!(
        settings.selected_algorithms(),
        &[Algorithm::GreyEdge, Algorithm::WhitePatch]
    );
    assert_eq!(settings.split_view_algorithm(), Some(Algorithm::GreyEdge));
}

#[test]
fn explicit_space_implies_manual_mode() {
    let settings = parse(&["--processing-space", "srgb"]).explorer_settings();
    assert_eq!(settings.color_space_mode(), ColorSpaceMode::Manual);
    assert_eq!(
        settings.effective_color_spaces(),
        (ColorSpace::Srgb, ColorSpace::Srgb)
    );
}

#[test]
fn explicit_auto_mode_ignores_space_flags() {
    let settings =
        parse(&["--mode", "auto", "--input-space", "linear_rgb"]).explorer_settings();
    assert_eq!(
        settings.effective_color_spaces(),
        (ColorSpace::Srgb, ColorSpace::LinearRgb)
    );
}

#[test]
fn unknown_algorithm_is_rejected() {
    let argv = ["explorer_cli", "--image", "a.jpg", "--algorithm", "retinex"];
    assert!(Args::try_parse_from(argv).is_err());
}

#[test]
fn formats_missing_averages() {
    assert_eq!(format_rgb(None), "n/a");
    assert_eq!(format_rgb(Some([0.5, 0.25, 1.0])), "(0.500, 0.250, 1.000)");
}

fn grey_world_request() -> ProcessingRequest {
    ProcessingRequest {
        algorithm: Algorithm::GreyWorld,
        input_color_space: ColorSpace::Srgb,
        processing_space: ColorSpace::LinearRgb,
        file: Arc::new(ImageFile::new("a.png", "image/png", vec![1, 2, 3])),
    }
}

#[tokio::test]
async fn no_service_configured_fails_requests_as_unavailable() {
    let processor = build_processor(None, Duration::from_secs(1)).expect("processor");
    let err = processor
        .process(grey_world_request())
        .await
        .expect_err("no service");
    assert_eq!(err, ProcessingError::Unavailable);
}

#[test]
fn configured_service_builds_http_client() {
    assert!(build_processor(Some("http://localhost:8000/api/v1"), Duration::from_secs(1)).is_ok());
    assert!(build_processor(Some("localhost:8000"), Duration::from_secs(1)).is_err());
}

#[test]
fn empty_base_url_flag_disables_the_service() {
    let args = parse(&["--api-base-url", ""]);
    assert_eq!(
        config::configured_base_url(args.api_base_url.as_deref().unwrap_or_default())
            .expect("empty"),
        None
    );
}
