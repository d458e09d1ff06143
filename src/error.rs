//! Error types for rgbd-particles.
//!
//! Configuration, calibration, frame loading and GPU initialization can fail.
//! Per-cell depth problems are never errors; they travel through the
//! simulation as a discard flag instead.

use std::fmt;

/// Invalid simulation configuration or tunable value.
///
/// Construction-time variants are fatal: no partially started simulation is
/// ever returned.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Grid size outside the supported range.
    GridSize { requested: u32, min: u32, max: u32 },
    /// Particle size must be strictly positive.
    ParticleSize(f32),
    /// Depth range must satisfy `min < max`.
    DepthRange { min: f32, max: f32 },
    /// Filter radius must be non-negative.
    FilterRadius(f32),
    /// Filter threshold must be non-negative.
    FilterThreshold(f32),
    /// Lifetime range must be positive with `start <= end`.
    Lifetime { start: f32, end: f32 },
    /// Depth scale must be strictly positive.
    DepthScale(f32),
    /// The pass dependency graph contains a cycle.
    PassCycle,
    /// The pass dependency graph has no pass without same-tick inputs.
    NoRootPass,
    /// Lifecycle must be the only pass without same-tick inputs.
    RootPass(Vec<crate::graph::PassKind>),
    /// A pass is missing an input its body reads.
    MissingDependency { pass: crate::graph::PassKind, input: String },
    /// A pass declares the same input twice.
    DuplicateDependency { pass: crate::graph::PassKind, input: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::GridSize { requested, min, max } => {
                write!(f, "Grid size {} is outside the supported range {}..={}", requested, min, max)
            }
            ConfigError::ParticleSize(v) => write!(f, "Particle size must be > 0, got {}", v),
            ConfigError::DepthRange { min, max } => {
                write!(f, "Depth range must satisfy min < max, got [{}, {}]", min, max)
            }
            ConfigError::FilterRadius(v) => write!(f, "Filter radius must be >= 0, got {}", v),
            ConfigError::FilterThreshold(v) => write!(f, "Filter threshold must be >= 0, got {}", v),
            ConfigError::Lifetime { start, end } => {
                write!(f, "Lifetime range must be positive with start <= end, got {}..{}", start, end)
            }
            ConfigError::DepthScale(v) => write!(f, "Depth scale must be > 0, got {}", v),
            ConfigError::PassCycle => write!(f, "Simulation passes form a dependency cycle"),
            ConfigError::NoRootPass => write!(f, "Simulation passes have no root pass"),
            ConfigError::RootPass(roots) => {
                write!(f, "Lifecycle must be the only root pass, got {:?}", roots)
            }
            ConfigError::MissingDependency { pass, input } => {
                write!(f, "The {} pass must read {}", pass.name(), input)
            }
            ConfigError::DuplicateDependency { pass, input } => {
                write!(f, "The {} pass reads {} more than once", pass.name(), input)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors that can occur while reading camera calibration.
#[derive(Debug)]
pub enum CalibrationError {
    /// No `{"intrinsic` block found in the recording.
    MetadataNotFound,
    /// Metadata block is not valid JSON.
    Json(serde_json::Error),
    /// The intrinsic matrix does not have nine elements.
    MatrixLength(usize),
    /// Failed to read the metadata file.
    Io(std::io::Error),
}

impl fmt::Display for CalibrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalibrationError::MetadataNotFound => {
                write!(f, "No intrinsic matrix metadata found in recording")
            }
            CalibrationError::Json(e) => write!(f, "Failed to parse calibration metadata: {}", e),
            CalibrationError::MatrixLength(n) => {
                write!(f, "Intrinsic matrix must have 9 elements, got {}", n)
            }
            CalibrationError::Io(e) => write!(f, "Failed to read calibration file: {}", e),
        }
    }
}

impl std::error::Error for CalibrationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CalibrationError::Json(e) => Some(e),
            CalibrationError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CalibrationError {
    fn from(e: serde_json::Error) -> Self {
        CalibrationError::Json(e)
    }
}

impl From<std::io::Error> for CalibrationError {
    fn from(e: std::io::Error) -> Self {
        CalibrationError::Io(e)
    }
}

/// Errors that can occur while loading an RGBD frame.
#[derive(Debug)]
pub enum FrameError {
    /// Failed to decode image file.
    ImageLoad(image::ImageError),
    /// Failed to read file from disk.
    Io(std::io::Error),
    /// Side-by-side frames need an even, non-zero width.
    OddWidth(u32),
    /// Pixel buffer length does not match the dimensions.
    SizeMismatch { expected: usize, actual: usize },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::ImageLoad(e) => write!(f, "Failed to load frame image: {}", e),
            FrameError::Io(e) => write!(f, "Failed to read frame file: {}", e),
            FrameError::OddWidth(w) => {
                write!(f, "RGBD frame width must be even and non-zero, got {}", w)
            }
            FrameError::SizeMismatch { expected, actual } => {
                write!(f, "RGBA data size mismatch: expected {} bytes, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for FrameError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FrameError::ImageLoad(e) => Some(e),
            FrameError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for FrameError {
    fn from(e: image::ImageError) -> Self {
        FrameError::ImageLoad(e)
    }
}

impl From<std::io::Error> for FrameError {
    fn from(e: std::io::Error) -> Self {
        FrameError::Io(e)
    }
}

/// Errors that can occur during GPU initialization.
#[derive(Debug)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    SurfaceCreation(wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    NoAdapter,
    /// Failed to create GPU device.
    DeviceCreation(wgpu::RequestDeviceError),
    /// A texture format the simulation needs cannot be sampled on this adapter.
    UnsupportedFormat(wgpu::TextureFormat),
    /// State buffers for this grid exceed the device storage binding limit.
    GridTooLarge { grid_size: u32, bytes: u64, limit: u64 },
    /// Frame exceeds the device texture dimension limit.
    FrameTooLarge { width: u32, height: u32, limit: u32 },
}

impl fmt::Display for GpuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GpuError::SurfaceCreation(e) => write!(f, "Failed to create GPU surface: {}", e),
            GpuError::NoAdapter => write!(f, "No compatible GPU adapter found. Ensure your system has a GPU with WebGPU/Vulkan/Metal/DX12 support."),
            GpuError::DeviceCreation(e) => write!(f, "Failed to create GPU device: {}", e),
            GpuError::UnsupportedFormat(format) => {
                write!(f, "Texture format {:?} cannot be sampled on this GPU", format)
            }
            GpuError::GridTooLarge { grid_size, bytes, limit } => write!(
                f,
                "Grid {0}x{0} needs {1} bytes per state buffer, device limit is {2}",
                grid_size, bytes, limit
            ),
            GpuError::FrameTooLarge { width, height, limit } => write!(
                f,
                "Frame {}x{} exceeds the device texture limit of {}",
                width, height, limit
            ),
        }
    }
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::SurfaceCreation(e) => Some(e),
            GpuError::DeviceCreation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<wgpu::CreateSurfaceError> for GpuError {
    fn from(e: wgpu::CreateSurfaceError) -> Self {
        GpuError::SurfaceCreation(e)
    }
}

impl From<wgpu::RequestDeviceError> for GpuError {
    fn from(e: wgpu::RequestDeviceError) -> Self {
        GpuError::DeviceCreation(e)
    }
}

/// Errors that can occur when running the viewer.
#[derive(Debug)]
pub enum SimulationError {
    /// Failed to create event loop.
    EventLoop(winit::error::EventLoopError),
    /// Failed to create window.
    Window(winit::error::OsError),
    /// GPU initialization failed.
    Gpu(GpuError),
    /// Simulation configuration was rejected.
    Config(ConfigError),
    /// Frame could not be loaded.
    Frame(FrameError),
    /// Calibration could not be loaded.
    Calibration(CalibrationError),
}

impl fmt::Display for SimulationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimulationError::EventLoop(e) => write!(f, "Failed to create event loop: {}", e),
            SimulationError::Window(e) => write!(f, "Failed to create window: {}", e),
            SimulationError::Gpu(e) => write!(f, "GPU error: {}", e),
            SimulationError::Config(e) => write!(f, "Configuration error: {}", e),
            SimulationError::Frame(e) => write!(f, "Frame error: {}", e),
            SimulationError::Calibration(e) => write!(f, "Calibration error: {}", e),
        }
    }
}

impl std::error::Error for SimulationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SimulationError::EventLoop(e) => Some(e),
            SimulationError::Window(e) => Some(e),
            SimulationError::Gpu(e) => Some(e),
            SimulationError::Config(e) => Some(e),
            SimulationError::Frame(e) => Some(e),
            SimulationError::Calibration(e) => Some(e),
        }
    }
}

impl From<winit::error::EventLoopError> for SimulationError {
    fn from(e: winit::error::EventLoopError) -> Self {
        SimulationError::EventLoop(e)
    }
}

impl From<winit::error::OsError> for SimulationError {
    fn from(e: winit::error::OsError) -> Self {
        SimulationError::Window(e)
    }
}

impl From<GpuError> for SimulationError {
    fn from(e: GpuError) -> Self {
        SimulationError::Gpu(e)
    }
}

impl From<ConfigError> for SimulationError {
    fn from(e: ConfigError) -> Self {
        SimulationError::Config(e)
    }
}

impl From<FrameError> for SimulationError {
    fn from(e: FrameError) -> Self {
        SimulationError::Frame(e)
    }
}

impl From<CalibrationError> for SimulationError {
    fn from(e: CalibrationError) -> Self {
        SimulationError::Calibration(e)
    }
}
