//! Renders through a real adapter. Run with `--ignored` on a machine with a
//! GPU or a software rasterizer.

use std::cell::Cell;
use std::rc::Rc;

use rasterprint_engine::config::CapabilityRequest;
use rasterprint_engine::device::{ProgramSource, VertexAttrib, WgpuDriver, WgpuOptions};
use rasterprint_engine::probe::{self, ProbeConfig};
use rasterprint_engine::render::{Renderer, ScenePainter};
use rasterprint_engine::surface::{Current, PixelBuffer};

fn options() -> WgpuOptions {
    WgpuOptions {
        force_fallback_adapter: std::env::var_os("RASTERPRINT_SOFTWARE").is_some(),
        ..WgpuOptions::default()
    }
}

#[test]
#[ignore = "needs a GPU adapter"]
fn consecutive_frames_are_identical() {
    let mut buffer = PixelBuffer::new(
        WgpuDriver::new(options()),
        64,
        64,
        CapabilityRequest::rgba8(16, 0),
    );
    assert!(buffer.is_valid());
    buffer.set_renderer(ScenePainter::new());

    let first = buffer.get_bitmap().expect("first frame");
    let second = buffer.get_bitmap().expect("second frame");
    buffer.destroy();

    assert_eq!(first.as_bytes(), second.as_bytes());
}

#[test]
#[ignore = "needs a GPU adapter"]
fn scene_is_drawn_over_transparent_background() {
    let config = ProbeConfig {
        gpu: options(),
        ..ProbeConfig::default()
    };
    let capture = probe::capture(&config).expect("capture");
    let image = &capture.image;

    // Corners stay at the clear color.
    assert_eq!(image.pixel(0, 0), Some([0, 0, 0, 0]));
    assert_eq!(image.pixel(249, 249), Some([0, 0, 0, 0]));

    // Something opaque was drawn.
    assert!(image.as_bytes().chunks_exact(4).any(|px| px[3] == 255));
    assert!(!capture.device.renderer.is_empty());
}

#[test]
#[ignore = "needs a GPU adapter"]
fn triangle_sits_left_of_cube() {
    let capture = probe::capture(&ProbeConfig {
        gpu: options(),
        ..ProbeConfig::default()
    })
    .expect("capture");
    let image = &capture.image;
    let mid = image.height() / 2;

    // The triangle is centered at x = -1.5 and the cube at the origin.
    let opaque_cols: Vec<u32> = (0..image.width())
        .filter(|&x| image.pixel(x, mid).is_some_and(|px| px[3] == 255))
        .collect();
    assert!(!opaque_cols.is_empty());
    assert!(opaque_cols[0] < image.width() / 2);
}

#[test]
#[ignore = "needs a GPU adapter"]
fn triangle_apex_is_red_and_on_top() {
    let capture = probe::capture(&ProbeConfig {
        gpu: options(),
        ..ProbeConfig::default()
    })
    .expect("capture");
    let image = &capture.image;

    // Column through the apex, clear of the cube.
    let x = image.width() * 24 / 100;
    let rows: Vec<u32> = (0..image.height())
        .filter(|&y| image.pixel(x, y).is_some_and(|px| px[3] == 255))
        .collect();
    let (Some(&top), Some(&bottom)) = (rows.first(), rows.last()) else {
        panic!("no triangle in column {x}");
    };
    assert!(top < image.height() / 2 && bottom > image.height() / 2);

    let [r, g, b, _] = image.pixel(x, top).unwrap();
    assert!(r > g && r > b, "apex is {:?}", (r, g, b));
    let [r, g, b, _] = image.pixel(x, bottom).unwrap();
    assert!(g > r && b > r, "base is {:?}", (r, g, b));
}

const FRAGMENT: &str =
    "@fragment fn fs_main() -> @location(0) vec4<f32> { return vec4<f32>(1.0); }";

/// Records whether a program built from `vertex` linked.
struct LinkAttempt {
    vertex: &'static str,
    linked: Rc<Cell<Option<bool>>>,
}

impl Renderer for LinkAttempt {
    fn on_create(&mut self, gl: &mut Current<'_>) {
        let source = ProgramSource {
            label: "link attempt",
            vertex: self.vertex,
            fragment: FRAGMENT,
            attributes: &[VertexAttrib {
                name: "position",
                components: 3,
            }],
            uniforms: &["model_view"],
        };
        self.linked.set(Some(gl.create_program(&source).is_ok()));
    }

    fn on_resize(&mut self, _gl: &mut Current<'_>, _width: u32, _height: u32) {}

    fn on_draw(&mut self, _gl: &mut Current<'_>) {}
}

#[test]
#[ignore = "needs a GPU adapter"]
fn invalid_shader_fails_to_link() {
    let linked = Rc::new(Cell::new(None));
    let mut buffer = PixelBuffer::new(
        WgpuDriver::new(options()),
        16,
        16,
        CapabilityRequest::rgba8(16, 0),
    );
    assert!(buffer.is_valid());
    buffer.set_renderer(LinkAttempt {
        vertex: "this is not a shader",
        linked: Rc::clone(&linked),
    });

    // A failed link leaves the surface usable.
    assert!(buffer.get_bitmap().is_some());
    buffer.destroy();
    assert_eq!(linked.get(), Some(false));
}
