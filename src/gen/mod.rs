//! Synthetic payload generators
//!
//! Produces deterministic-size, pseudo-random payloads for each supported
//! data kind. Generation is seeded so runs are reproducible, and payloads
//! are reused across a window of records so that generation cost does not
//! become the bottleneck being measured.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

use crate::config::{DataKind, SizeSpec};
use crate::{LogBenchError, Result, PAYLOAD_REGEN_INTERVAL};

/// Character set used for text payloads
const TEXT_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789 ";

/// One synthetic payload, structured per data kind
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Point cloud: positions in [-10, 10] with per-point RGB colors
    Points3d {
        positions: Vec<[f32; 3]>,
        colors: Vec<[u8; 3]>,
    },
    /// RGB8 image, row-major, 3 bytes per pixel
    Image {
        width: u32,
        height: u32,
        pixels: Vec<u8>,
    },
    /// Text log line
    Text(String),
    /// Triangle mesh: vertices, triangle indices, per-vertex colors
    Mesh {
        vertices: Vec<[f32; 3]>,
        triangles: Vec<[u32; 3]>,
        colors: Vec<[u8; 3]>,
    },
}

impl Payload {
    /// The data kind of this payload
    pub fn kind(&self) -> DataKind {
        match self {
            Payload::Points3d { .. } => DataKind::Points3d,
            Payload::Image { .. } => DataKind::Image,
            Payload::Text(_) => DataKind::Text,
            Payload::Mesh { .. } => DataKind::Mesh,
        }
    }

    /// Structural element count: points, pixels, characters, or vertices
    pub fn unit_count(&self) -> u64 {
        match self {
            Payload::Points3d { positions, .. } => positions.len() as u64,
            Payload::Image { width, height, .. } => (*width as u64) * (*height as u64),
            Payload::Text(text) => text.chars().count() as u64,
            Payload::Mesh { vertices, .. } => vertices.len() as u64,
        }
    }

    /// Approximate wire size of the payload content in bytes
    pub fn byte_len(&self) -> usize {
        match self {
            Payload::Points3d { positions, colors } => {
                positions.len() * 12 + colors.len() * 3
            }
            Payload::Image { pixels, .. } => pixels.len(),
            Payload::Text(text) => text.len(),
            Payload::Mesh {
                vertices,
                triangles,
                colors,
            } => vertices.len() * 12 + triangles.len() * 12 + colors.len() * 3,
        }
    }
}

/// Generate a payload of the given kind whose structural size exactly
/// matches the descriptor. Content is pseudo-random per seed.
pub fn generate(kind: DataKind, size: &SizeSpec, seed: u64) -> Result<Payload> {
    match (kind, size) {
        (DataKind::Points3d, SizeSpec::Count(n)) => Ok(generate_points3d(*n as usize, seed)),
        (DataKind::Image, SizeSpec::Dimensions { width, height }) => {
            Ok(generate_image(*width, *height, seed))
        }
        // A flat count for an image means a square frame.
        (DataKind::Image, SizeSpec::Count(n)) => Ok(generate_image(*n as u32, *n as u32, seed)),
        (DataKind::Text, SizeSpec::Count(n)) => Ok(generate_text(*n as usize, seed)),
        (DataKind::Mesh, SizeSpec::Count(n)) => Ok(generate_mesh(*n as usize, seed)),
        (kind, SizeSpec::Dimensions { .. }) => Err(LogBenchError::InvalidSizeDescriptor(
            format!("{} payloads take an element count, not dimensions", kind.name()),
        )),
    }
}

/// Generate a random 3D point cloud
pub fn generate_points3d(num_points: usize, seed: u64) -> Payload {
    let mut rng = SmallRng::seed_from_u64(seed);

    let positions = (0..num_points)
        .map(|_| {
            [
                rng.gen_range(-10.0f32..10.0),
                rng.gen_range(-10.0f32..10.0),
                rng.gen_range(-10.0f32..10.0),
            ]
        })
        .collect();
    let colors = (0..num_points).map(|_| random_color(&mut rng)).collect();

    Payload::Points3d { positions, colors }
}

/// Generate a random RGB8 image
pub fn generate_image(width: u32, height: u32, seed: u64) -> Payload {
    let mut rng = SmallRng::seed_from_u64(seed);

    let mut pixels = vec![0u8; (width as usize) * (height as usize) * 3];
    rng.fill(pixels.as_mut_slice());

    Payload::Image {
        width,
        height,
        pixels,
    }
}

/// Generate a random text log line
pub fn generate_text(length: usize, seed: u64) -> Payload {
    let mut rng = SmallRng::seed_from_u64(seed);

    let text: String = (0..length)
        .map(|_| TEXT_CHARS[rng.gen_range(0..TEXT_CHARS.len())] as char)
        .collect();

    Payload::Text(text)
}

/// Generate a random triangle mesh. Vertex counts below 3 are clamped up
/// so the mesh always contains at least one triangle.
pub fn generate_mesh(num_vertices: usize, seed: u64) -> Payload {
    let mut rng = SmallRng::seed_from_u64(seed);
    let num_vertices = num_vertices.max(3);

    let vertices: Vec<[f32; 3]> = (0..num_vertices)
        .map(|_| {
            [
                rng.gen_range(-10.0f32..10.0),
                rng.gen_range(-10.0f32..10.0),
                rng.gen_range(-10.0f32..10.0),
            ]
        })
        .collect();

    // Triangle-strip style indexing over the vertex list.
    let num_triangles = num_vertices - 2;
    let triangles = (0..num_triangles)
        .map(|i| [i as u32, (i + 1) as u32, (i + 2) as u32])
        .collect();

    let colors = (0..num_vertices).map(|_| random_color(&mut rng)).collect();

    Payload::Mesh {
        vertices,
        triangles,
        colors,
    }
}

fn random_color(rng: &mut SmallRng) -> [u8; 3] {
    [rng.gen(), rng.gen(), rng.gen()]
}

/// Payload source for one stream: reuses the current payload and only
/// regenerates every [`PAYLOAD_REGEN_INTERVAL`] records.
#[derive(Debug)]
pub struct PayloadSource {
    kind: DataKind,
    size: SizeSpec,
    current: Arc<Payload>,
}

impl PayloadSource {
    /// Create a payload source, generating the initial payload with seed 0
    pub fn new(kind: DataKind, size: SizeSpec) -> Result<Self> {
        let current = Arc::new(generate(kind, &size, 0)?);
        Ok(Self {
            kind,
            size,
            current,
        })
    }

    /// Payload for the record at `index`, regenerating on window boundaries
    pub fn payload_for(&mut self, index: u64) -> Arc<Payload> {
        if index > 0 && index % PAYLOAD_REGEN_INTERVAL == 0 {
            // Size is validated at construction, so regeneration cannot fail.
            if let Ok(payload) = generate(self.kind, &self.size, index) {
                self.current = Arc::new(payload);
            }
        }
        Arc::clone(&self.current)
    }
}
