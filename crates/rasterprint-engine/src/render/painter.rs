use anyhow::{Context, Result};

use crate::device::{
    AttribLocation, BufferId, BufferTarget, Capability, ClearMask, ProgramId, ProgramSource,
    UniformLocation, VertexAttrib,
};
use crate::surface::Current;

use super::Renderer;
use super::scene::{self, CLEAR_COLOR, CUBE, PROJECTION, Shape, TRIANGLE, TRIANGLE_MODEL_VIEW};

const POSITION: &str = "position";
const COLOR: &str = "color";
const POSITION_COMPONENTS: u32 = 3;
const COLOR_COMPONENTS: u32 = 4;

const ATTRIBUTES: [VertexAttrib<'static>; 2] = [
    VertexAttrib {
        name: POSITION,
        components: POSITION_COMPONENTS,
    },
    VertexAttrib {
        name: COLOR,
        components: COLOR_COMPONENTS,
    },
];

const PROJECTION_UNIFORM: &str = "projection";
const MODEL_VIEW_UNIFORM: &str = "model_view";
const UNIFORMS: [&str; 2] = [PROJECTION_UNIFORM, MODEL_VIEW_UNIFORM];

const PROGRAM: ProgramSource<'static> = ProgramSource {
    label: "scene",
    vertex: include_str!("shaders/scene_vertex.wgsl"),
    fragment: include_str!("shaders/scene_fragment.wgsl"),
    attributes: &ATTRIBUTES,
    uniforms: &UNIFORMS,
};

struct ShapeBuffers {
    positions: BufferId,
    colors: BufferId,
}

impl ShapeBuffers {
    fn upload<const N: usize>(gl: &mut Current<'_>, shape: &Shape<N>) -> Result<Self> {
        Ok(Self {
            positions: gl.create_buffer(BufferTarget::Array, shape.position_bytes())?,
            colors: gl.create_buffer(BufferTarget::Array, shape.color_bytes())?,
        })
    }
}

/// Everything `on_create` produced.
struct Resources {
    program: ProgramId,
    position: AttribLocation,
    color: AttribLocation,
    projection: UniformLocation,
    model_view: UniformLocation,

    triangle: ShapeBuffers,
    cube: ShapeBuffers,
    cube_indices: BufferId,
}

enum State {
    Uncreated,
    Created(Resources),
    /// Creation failed; drawing is a no-op for the rest of the painter's life.
    Invalid,
}

/// Draws the fixed fingerprint scene.
///
/// Creation runs at most once: from `on_create`, or lazily from the first
/// `on_draw`. A failed creation is never retried.
pub struct ScenePainter {
    state: State,
}

impl ScenePainter {
    pub fn new() -> Self {
        Self {
            state: State::Uncreated,
        }
    }

    pub fn is_created(&self) -> bool {
        matches!(self.state, State::Created(_))
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self.state, State::Invalid)
    }

    fn create(gl: &mut Current<'_>) -> Result<Resources> {
        let program = gl.create_program(&PROGRAM)?;
        gl.use_program(program);

        let position = gl
            .attrib_location(program, POSITION)
            .context("program has no position attribute")?;
        let color = gl
            .attrib_location(program, COLOR)
            .context("program has no color attribute")?;
        gl.enable_vertex_attrib_array(position);
        gl.enable_vertex_attrib_array(color);

        let projection = gl
            .uniform_location(program, PROJECTION_UNIFORM)
            .context("program has no projection uniform")?;
        let model_view = gl
            .uniform_location(program, MODEL_VIEW_UNIFORM)
            .context("program has no model-view uniform")?;

        let triangle = ShapeBuffers::upload(gl, &TRIANGLE)?;
        let cube = ShapeBuffers::upload(gl, &CUBE.shape)?;
        let cube_indices = gl.create_buffer(BufferTarget::ElementArray, CUBE.index_bytes())?;

        gl.clear_color(CLEAR_COLOR);
        gl.enable(Capability::DepthTest);

        Ok(Resources {
            program,
            position,
            color,
            projection,
            model_view,
            triangle,
            cube,
            cube_indices,
        })
    }

    fn draw(res: &Resources, gl: &mut Current<'_>) {
        gl.clear(ClearMask::COLOR | ClearMask::DEPTH);

        gl.vertex_attrib_pointer(res.position, res.triangle.positions, POSITION_COMPONENTS);
        gl.vertex_attrib_pointer(res.color, res.triangle.colors, COLOR_COMPONENTS);
        gl.uniform_matrix4(res.projection, &PROJECTION);
        gl.uniform_matrix4(res.model_view, &TRIANGLE_MODEL_VIEW);
        gl.draw_arrays(0, TRIANGLE.positions.len() as u32);

        gl.vertex_attrib_pointer(res.position, res.cube.positions, POSITION_COMPONENTS);
        gl.vertex_attrib_pointer(res.color, res.cube.colors, COLOR_COMPONENTS);
        gl.uniform_matrix4(res.projection, &PROJECTION);
        gl.uniform_matrix4(res.model_view, &scene::cube_model_view());
        gl.draw_elements(res.cube_indices, CUBE.indices.len() as u32);
    }
}

impl Default for ScenePainter {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for ScenePainter {
    fn on_create(&mut self, gl: &mut Current<'_>) {
        if !matches!(self.state, State::Uncreated) {
            log::debug!("scene already created");
            return;
        }

        self.state = match Self::create(gl) {
            Ok(resources) => {
                log::debug!("scene program {:?} ready", resources.program);
                State::Created(resources)
            }
            Err(err) => {
                log::warn!("scene unavailable, frames will be blank: {err:#}");
                State::Invalid
            }
        };
    }

    fn on_resize(&mut self, _gl: &mut Current<'_>, width: u32, height: u32) {
        log::trace!("scene surface is {width}x{height}");
    }

    fn on_draw(&mut self, gl: &mut Current<'_>) {
        if matches!(self.state, State::Uncreated) {
            self.on_create(gl);
        }
        if let State::Created(resources) = &self.state {
            Self::draw(resources, gl);
        }
    }
}
