//! GPU face of the step program
//!
//! Wraps one WGSL compute shader into a pipeline that reads the current
//! state buffer and writes every cell of the next one. The pipeline is
//! compiled once; per frame only the bind group selected by the pair's role
//! flag changes.

use crate::pipeline::state_buffer::BufferShape;
use crate::wgpu_utils::{binding_types, UniformBuffer};

/// Uniform block every step shader receives at group(1) binding(0). The
/// `knobs` slots carry demo-specific parameters mapped from the bus; their
/// meaning is documented next to each demo's shader source.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StepUniforms {
    /// Sub-step delta in simulated seconds. Non-negative and clamped.
    pub delta: f32,
    /// Total simulated seconds.
    pub time: f32,
    pub width: u32,
    pub height: u32,
    /// Pointer position in normalized device-ish coordinates.
    pub cursor: [f32; 2],
    /// Surface size in pixels, for aspect correction.
    pub viewport: [f32; 2],
    pub knobs: [f32; 8],
}

impl Default for StepUniforms {
    fn default() -> Self {
        Self {
            delta: 0.0,
            time: 0.0,
            width: 0,
            height: 0,
            cursor: [0.0, 0.0],
            viewport: [1.0, 1.0],
            knobs: [0.0; 8],
        }
    }
}

const WORKGROUP_SIZE: (u32, u32) = (8, 8);

pub struct GpuStepProgram {
    pipeline: wgpu::ComputePipeline,
    uniforms: UniformBuffer<StepUniforms>,
    uniform_bind_group: wgpu::BindGroup,
    label: String,
}

impl GpuStepProgram {
    /// Compile `shader_source` with `entry_point` against the state pair's
    /// layout at group(0), the shared uniforms at group(1), and any
    /// demo-specific layouts (auxiliary textures, static data buffers) from
    /// group(2) on.
    pub fn new(
        device: &wgpu::Device,
        shader_source: &str,
        entry_point: &str,
        state_layout: &wgpu::BindGroupLayout,
        extra_layouts: &[&wgpu::BindGroupLayout],
        label: &str,
    ) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(&format!("{label} step shader")),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label} step uniforms layout")),
            entries: &[binding_types::entry(
                0,
                wgpu::ShaderStages::COMPUTE,
                binding_types::uniform(),
            )],
        });

        let uniforms = UniformBuffer::new_with_data(device, &StepUniforms::default());
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{label} step uniforms")),
            layout: &uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniforms.binding_resource(),
            }],
        });

        let mut layouts: Vec<&wgpu::BindGroupLayout> = vec![state_layout, &uniform_layout];
        layouts.extend_from_slice(extra_layouts);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{label} step pipeline layout")),
            bind_group_layouts: &layouts,
            push_constant_ranges: &[],
        });

        let pipeline = device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{label} step pipeline")),
            layout: Some(&pipeline_layout),
            module: &shader,
            entry_point: Some(entry_point),
            compilation_options: Default::default(),
            cache: None,
        });

        Self {
            pipeline,
            uniforms,
            uniform_bind_group,
            label: label.to_string(),
        }
    }

    pub fn write_uniforms(&mut self, queue: &wgpu::Queue, uniforms: StepUniforms) {
        self.uniforms.update_content(queue, uniforms);
    }

    /// Record one compute pass over every cell of `shape`. `state_bind`
    /// must be the pair's bind group for the frame's current role, and
    /// `extra_binds` must match the layouts given at construction.
    pub fn dispatch(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        state_bind: &wgpu::BindGroup,
        extra_binds: &[&wgpu::BindGroup],
        shape: BufferShape,
    ) {
        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(&format!("{} step pass", self.label)),
            timestamp_writes: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, state_bind, &[]);
        pass.set_bind_group(1, &self.uniform_bind_group, &[]);
        for (i, bind) in extra_binds.iter().enumerate() {
            pass.set_bind_group(2 + i as u32, *bind, &[]);
        }

        let (gx, gy) = dispatch_size(shape);
        pass.dispatch_workgroups(gx, gy, 1);
    }
}

/// Ceil-divided workgroup counts covering the whole grid.
pub fn dispatch_size(shape: BufferShape) -> (u32, u32) {
    (
        shape.width.div_ceil(WORKGROUP_SIZE.0),
        shape.height.div_ceil(WORKGROUP_SIZE.1),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_covers_every_cell() {
        let shape = BufferShape::new(128, 128, 1).unwrap();
        assert_eq!(dispatch_size(shape), (16, 16));

        // Non-multiples round up, never down.
        let shape = BufferShape::new(130, 7, 1).unwrap();
        let (gx, gy) = dispatch_size(shape);
        assert!(gx * WORKGROUP_SIZE.0 >= 130);
        assert!(gy * WORKGROUP_SIZE.1 >= 7);
        assert_eq!((gx, gy), (17, 1));
    }
}
