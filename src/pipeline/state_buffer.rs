//! State buffer pairs and the ping-pong swap protocol
//!
//! A simulation's state lives in two equally-shaped buffers that alternate
//! between "current" (read) and "next" (write) roles each step. `swap()`
//! exchanges roles in O(1); the storage itself never moves.

use crate::error::{Result, RippleError};

/// Largest storage binding the GPU context requests from the host
/// (`max_storage_buffer_binding_size` of the downlevel defaults). Shapes are
/// checked against it at construction so an oversized grid fails with a
/// configuration error instead of a validation error mid-frame.
pub const MAX_BINDING_BYTES: u64 = 128 << 20;

/// Dimensions of one state buffer: a grid (or a flat particle table folded
/// into rows) with 1-4 f32 channels per cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferShape {
    pub width: u32,
    pub height: u32,
    pub channels: u32,
}

impl BufferShape {
    pub fn new(width: u32, height: u32, channels: u32) -> Result<Self> {
        if width == 0 || height == 0 || channels == 0 || channels > 4 {
            return Err(RippleError::BadShape {
                width,
                height,
                channels,
            });
        }
        let shape = Self {
            width,
            height,
            channels,
        };
        if shape.byte_len() > MAX_BINDING_BYTES {
            return Err(RippleError::BufferTooLarge {
                bytes: shape.byte_len(),
                max: MAX_BINDING_BYTES,
            });
        }
        Ok(shape)
    }

    /// Shape for a flat table of `count` records folded into rows of
    /// `max_row` entries. Rejects counts that do not fit `max_row` rows of
    /// `max_row` entries rather than truncating.
    pub fn for_count(count: u64, max_row: u32, channels: u32) -> Result<Self> {
        let max = max_row as u64 * max_row as u64;
        if count == 0 || count > max {
            return Err(RippleError::GridTooLarge {
                requested: count,
                max,
            });
        }
        let width = (count.min(max_row as u64)) as u32;
        let height = count.div_ceil(max_row as u64) as u32;
        let width = if height > 1 { max_row } else { width };
        Self::new(width, height, channels)
    }

    pub fn cell_count(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Number of f32 values in one buffer of this shape.
    pub fn float_len(&self) -> usize {
        (self.cell_count() * self.channels as u64) as usize
    }

    pub fn byte_len(&self) -> u64 {
        self.cell_count() * self.channels as u64 * std::mem::size_of::<f32>() as u64
    }
}

/// Two storage handles plus a role flag.
///
/// Exactly one buffer holds the authoritative state at any instant; the
/// other holds stale data from two generations ago, about to be overwritten.
pub struct StatePair<T> {
    a: T,
    b: T,
    a_is_current: bool,
}

impl<T> StatePair<T> {
    pub fn new(a: T, b: T) -> Self {
        Self {
            a,
            b,
            a_is_current: true,
        }
    }

    /// Exchange the current/next roles. No data moves.
    pub fn swap(&mut self) {
        self.a_is_current = !self.a_is_current;
    }

    pub fn a_is_current(&self) -> bool {
        self.a_is_current
    }

    pub fn current(&self) -> &T {
        if self.a_is_current {
            &self.a
        } else {
            &self.b
        }
    }

    pub fn next(&self) -> &T {
        if self.a_is_current {
            &self.b
        } else {
            &self.a
        }
    }

    pub fn current_mut(&mut self) -> &mut T {
        if self.a_is_current {
            &mut self.a
        } else {
            &mut self.b
        }
    }

    pub fn next_mut(&mut self) -> &mut T {
        if self.a_is_current {
            &mut self.b
        } else {
            &mut self.a
        }
    }

    /// Read/write pair for one step: `(current, next)` borrowed disjointly.
    pub fn split(&mut self) -> (&T, &mut T) {
        if self.a_is_current {
            (&self.a, &mut self.b)
        } else {
            (&self.b, &mut self.a)
        }
    }
}

/// GPU-resident state pair: two storage buffers and the two bind groups a
/// step program flips between. The bind groups are built once; per frame the
/// role flag alone decides which one the compute pass binds.
pub struct GpuStatePair {
    shape: BufferShape,
    pair: StatePair<wgpu::Buffer>,
    layout: wgpu::BindGroupLayout,
    bind_a_to_b: wgpu::BindGroup,
    bind_b_to_a: wgpu::BindGroup,
}

impl GpuStatePair {
    pub fn new(device: &wgpu::Device, shape: BufferShape, label: &str) -> Self {
        let make_buffer = |suffix: &str| {
            device.create_buffer(&wgpu::BufferDescriptor {
                label: Some(&format!("{label} state {suffix}")),
                size: shape.byte_len(),
                usage: wgpu::BufferUsages::STORAGE
                    | wgpu::BufferUsages::COPY_DST
                    | wgpu::BufferUsages::COPY_SRC,
                mapped_at_creation: false,
            })
        };
        let buffer_a = make_buffer("a");
        let buffer_b = make_buffer("b");

        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some(&format!("{label} state layout")),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: true },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::COMPUTE,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Storage { read_only: false },
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let make_bind = |name: &str, read: &wgpu::Buffer, write: &wgpu::Buffer| {
            device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&format!("{label} state {name}")),
                layout: &layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: read.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: write.as_entire_binding(),
                    },
                ],
            })
        };
        let bind_a_to_b = make_bind("a->b", &buffer_a, &buffer_b);
        let bind_b_to_a = make_bind("b->a", &buffer_b, &buffer_a);

        Self {
            shape,
            pair: StatePair::new(buffer_a, buffer_b),
            layout,
            bind_a_to_b,
            bind_b_to_a,
        }
    }

    pub fn shape(&self) -> BufferShape {
        self.shape
    }

    pub fn layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    pub fn swap(&mut self) {
        self.pair.swap();
    }

    /// Which buffer currently holds the `current` role. Display passes use
    /// this to pick the storage binding matching the step pass they follow.
    pub fn a_is_current(&self) -> bool {
        self.pair.a_is_current()
    }

    /// Bind group reading `current` and writing `next` for this frame.
    pub fn step_bind_group(&self) -> &wgpu::BindGroup {
        if self.pair.a_is_current() {
            &self.bind_a_to_b
        } else {
            &self.bind_b_to_a
        }
    }

    pub fn current(&self) -> &wgpu::Buffer {
        self.pair.current()
    }

    pub fn next(&self) -> &wgpu::Buffer {
        self.pair.next()
    }

    /// Seed both halves with a freshly generated initial condition, so the
    /// first step after a swap reads the data no matter which role it
    /// lands on. `data` must cover the whole buffer.
    pub fn seed(&self, queue: &wgpu::Queue, data: &[f32]) {
        debug_assert_eq!(data.len(), self.shape.float_len());
        let bytes: &[u8] = bytemuck::cast_slice(data);
        queue.write_buffer(self.pair.current(), 0, bytes);
        queue.write_buffer(self.pair.next(), 0, bytes);
    }

    /// Copy the current buffer back through a staging buffer. Blocks until
    /// the map completes; meant for tests and occasional CPU sync, not the
    /// per-frame path.
    pub fn readback_current(&self, device: &wgpu::Device, queue: &wgpu::Queue) -> Vec<f32> {
        let size = self.shape.byte_len();
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("state readback staging"),
            size,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("state readback encoder"),
        });
        encoder.copy_buffer_to_buffer(self.pair.current(), 0, &staging, 0, size);
        queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = device.poll(wgpu::PollType::Wait);

        match rx.recv() {
            Ok(Ok(())) => {
                let data = slice.get_mapped_range();
                bytemuck::cast_slice(&data).to_vec()
            }
            _ => {
                log::error!("state readback map failed");
                vec![0.0; self.shape.float_len()]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_rejects_zero_and_extra_channels() {
        assert!(BufferShape::new(0, 4, 1).is_err());
        assert!(BufferShape::new(4, 4, 0).is_err());
        assert!(BufferShape::new(4, 4, 5).is_err());
        assert!(BufferShape::new(4, 4, 4).is_ok());
    }

    #[test]
    fn shape_for_count_folds_into_rows() {
        let shape = BufferShape::for_count(10, 4096, 4).unwrap();
        assert_eq!(shape.width, 10);
        assert_eq!(shape.height, 1);

        let shape = BufferShape::for_count(5000, 4096, 4).unwrap();
        assert_eq!(shape.width, 4096);
        assert_eq!(shape.height, 2);
        assert!(shape.cell_count() >= 5000);
    }

    #[test]
    fn shape_rejects_grids_beyond_binding_limit() {
        // 4096^2 single-channel is 64 MiB and binds; 8192^2 is 256 MiB and
        // would blow past the limit the context requests.
        assert!(BufferShape::new(4096, 4096, 1).is_ok());
        let err = BufferShape::new(8192, 8192, 1).unwrap_err();
        match err {
            RippleError::BufferTooLarge { bytes, max } => {
                assert_eq!(bytes, 8192 * 8192 * 4);
                assert_eq!(max, MAX_BINDING_BYTES);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn shape_for_count_rejects_oversize() {
        let err = BufferShape::for_count(20, 4, 4).unwrap_err();
        match err {
            RippleError::GridTooLarge { requested, max } => {
                assert_eq!(requested, 20);
                assert_eq!(max, 16);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn swap_exchanges_roles_without_copying() {
        let a = vec![1.0f32];
        let b = vec![2.0f32];
        let a_ptr = a.as_ptr();
        let b_ptr = b.as_ptr();

        let mut pair = StatePair::new(a, b);
        assert!(pair.a_is_current());
        assert_eq!(pair.current().as_ptr(), a_ptr);
        assert_eq!(pair.next().as_ptr(), b_ptr);

        pair.swap();
        assert!(!pair.a_is_current());
        assert_eq!(pair.current().as_ptr(), b_ptr);
        assert_eq!(pair.next().as_ptr(), a_ptr);

        // swap is its own inverse
        pair.swap();
        assert!(pair.a_is_current());
        assert_eq!(pair.current().as_ptr(), a_ptr);
        assert_eq!(pair.next().as_ptr(), b_ptr);
    }

    #[test]
    fn split_borrows_read_and_write_disjointly() {
        let mut pair = StatePair::new(vec![1.0f32], vec![0.0f32]);
        {
            let (current, next) = pair.split();
            next[0] = current[0] * 2.0;
        }
        pair.swap();
        assert_eq!(pair.current()[0], 2.0);
    }
}
