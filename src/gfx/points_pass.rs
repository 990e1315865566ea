//! Point-list display pass
//!
//! Vertex-pulling: no vertex buffer, the demo's vertex stage indexes the
//! state storage buffer with `vertex_index`. Used for particles, cloth
//! nodes and cars. Same bind-group scheme as the screen pass: one group per
//! ping-pong buffer, the side to read picked at draw time.

use crate::wgpu_utils::{binding_types, entry, UniformBuffer};

use super::screen_pass::DisplayUniforms;

pub struct PointsPass {
    pipeline: wgpu::RenderPipeline,
    uniforms: UniformBuffer<DisplayUniforms>,
    bind_groups: [wgpu::BindGroup; 2],
}

impl PointsPass {
    pub fn new(
        device: &wgpu::Device,
        shader_source: &str,
        target_format: wgpu::TextureFormat,
        state_pair: (&wgpu::Buffer, &wgpu::Buffer),
        label: &str,
    ) -> PointsPass {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Wgsl(shader_source.into()),
        });

        let uniforms = UniformBuffer::<DisplayUniforms>::new(device, Some(label));

        let bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some(label),
                entries: &[
                    entry(
                        0,
                        wgpu::ShaderStages::VERTEX_FRAGMENT,
                        binding_types::uniform(),
                    ),
                    entry(
                        1,
                        wgpu::ShaderStages::VERTEX,
                        binding_types::storage_buffer(true),
                    ),
                ],
            });

        let make_group = |buffer: &wgpu::Buffer| {
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
        };
        let bind_groups = [make_group(state_pair.0), make_group(state_pair.1)];

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
                topology: wgpu::PrimitiveTopology::PointList,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        PointsPass {
            pipeline,
            uniforms,
            bind_groups,
        }
    }

    pub fn write_uniforms(&mut self, queue: &wgpu::Queue, content: DisplayUniforms) {
        self.uniforms.update_content(queue, content);
    }

    /// `read_a` picks the buffer the vertex stage pulls from; pass
    /// `!pair.a_is_current()` to read the freshly written side, or
    /// `pair.a_is_current()` for the last completed state.
    pub fn draw(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: &wgpu::TextureView,
        load: wgpu::LoadOp<wgpu::Color>,
        read_a: bool,
        count: u32,
    ) {
        let bind_group = if read_a {
            &self.bind_groups[0]
        } else {
            &self.bind_groups[1]
        };

        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("points pass"),
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
        pass.draw(0..count, 0..1);
    }
}
