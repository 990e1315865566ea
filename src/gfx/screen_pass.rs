//! Fullscreen display pass
//!
//! Draws a single fullscreen triangle with a demo-supplied WGSL module.
//! The shader sees group(0): binding 0 = display uniforms, binding 1 =
//! optional read-only state buffer. Passes that read a ping-pong pair get
//! one bind group per buffer and pick a side at draw time, so no
//! descriptor is rebuilt per frame.

use crate::wgpu_utils::{binding_types, entry, UniformBuffer};

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DisplayUniforms {
    pub viewport: [f32; 2],
    pub grid: [f32; 2],
    pub color_a: [f32; 4],
    pub color_b: [f32; 4],
    pub color_c: [f32; 4],
    pub knobs: [f32; 8],
}

pub struct ScreenPass {
    pipeline: wgpu::RenderPipeline,
    uniforms: UniformBuffer<DisplayUniforms>,
    // one group for a shader without state, two (read-a, read-b) with.
    bind_groups: Vec<wgpu::BindGroup>,
}

impl ScreenPass {
    pub fn new(
        device: &wgpu::Device,
        shader_source: &str,
        target_format: wgpu::TextureFormat,
        state_pair: Option<(&wgpu::Buffer, &wgpu::Buffer)>,
        label: &str,
    ) -> ScreenPass {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let uniforms = UniformBuffer::<DisplayUniforms>::new(device, Some(label));

        let mut layout_entries = vec![entry(
            0,
            wgpu::ShaderStages::FRAGMENT,
            binding_types::uniform(),
        )];
        if state_pair.is_some() {
            layout_entries.push(entry(
                1,
                wgpu::ShaderStages::FRAGMENT,
                binding_types::storage_buffer(true),
            ));
        }
        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &layout_entries,
            });

        let bind_groups = match state_pair {
            None => vec![device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(label),
                layout: &bind_group_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniforms.binding_resource(),
                }],
            })],
            Some((a, b)) => [a, b]
                .iter()
                .map(|buffer| {
                    device.create_bind_group(&wgpu::BindGroupDescriptor {
                        label: Some(label),
                        layout: &bind_group_layout,
                        entries: &[
                            wgpu::BindGroupEntry {
                                binding: 0,
                                resource: uniforms.binding_resource(),
                            },
                            wgpu::BindGroupEntry {
                                binding: 1,
                                resource: buffer.as_entire_binding(),
                            },
                        ],
                    })
                })
                .collect(),
        };

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: target_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        ScreenPass {
            pipeline,
            uniforms,
            bind_groups,
        }
    }

    pub fn write_uniforms(&mut self, queue: &wgpu::Queue, content: DisplayUniforms) {
        self.uniforms.update_content(queue, content);
    }

    /// Draw the fullscreen triangle. `read_a` picks which half of the pair
    /// the shader sees; pass `!pair.a_is_current()` to read the buffer the
    /// step has just written. Shaders without a state binding ignore it.
    pub fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
        read_a: bool,
    ) {
        let bind_group = if self.bind_groups.len() == 2 && !read_a {
            &self.bind_groups[1]
        } else {
            &self.bind_groups[0]
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("screen pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: target,
                resolve_target: None,
                ops: wgpu::Operations {
                    load,
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

/// Shared fullscreen-triangle vertex stage, concatenated ahead of each
/// demo's fragment source.
pub const FULLSCREEN_VS: &str = r#"
struct VsOut {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@builtin(vertex_index) index: u32) -> VsOut {
    var out: VsOut;
    let x = f32(i32(index & 1u) * 4 - 1);
    let y = f32(i32(index & 2u) * 2 - 1);
    out.position = vec4<f32>(x, y, 0.0, 1.0);
    out.uv = vec2<f32>(x, y) * 0.5 + 0.5;
    return out;
}
"#;
