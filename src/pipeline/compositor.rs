//! Ordered pass execution over the state buffers
//!
//! A compositor is built once per demo: an ordered list of passes, each
//! declaring what it reads and writes by name. Validation rejects a plan in
//! which a pass depends on a resource only a later pass produces, so the
//! "step before visualize" ordering holds by construction rather than by
//! global state. Per frame the passes receive the pair's current role, which
//! is how one compiled step program flips between the a->b and b->a bind
//! groups without recompiling.

use crate::error::{Result, RippleError};

/// What one pass touches, by resource name. Names are demo-local; the
/// swap-managed pair conventionally exposes `state.current` (external input,
/// frozen for the frame) and `state.next` (written by the step pass).
#[derive(Debug, Clone)]
pub struct PassDesc {
    pub name: String,
    pub reads: Vec<String>,
    pub writes: Vec<String>,
}

impl PassDesc {
    pub fn new(name: &str, reads: &[&str], writes: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            reads: reads.iter().map(|s| s.to_string()).collect(),
            writes: writes.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Per-frame inputs every pass can see.
pub struct ComposeCtx<'a> {
    /// The visible surface for passes whose write target is the screen.
    pub surface: &'a wgpu::TextureView,
    /// Role flag of the state pair after this frame's swap: selects which
    /// prebuilt bind group the step pass uses.
    pub a_is_current: bool,
    /// Surface size in pixels.
    pub viewport: (u32, u32),
}

type PassFn<C> = Box<dyn FnMut(&mut C, &mut wgpu::CommandEncoder, &ComposeCtx)>;

struct Pass<C> {
    desc: PassDesc,
    run: PassFn<C>,
}

/// Ordered pass list over a demo-owned resource struct `C`.
pub struct Compositor<C> {
    /// Resources that exist before the first pass runs (the current state
    /// buffer, uploaded data textures, the previous frame's output).
    external: Vec<String>,
    passes: Vec<Pass<C>>,
}

impl<C> Compositor<C> {
    pub fn new(external: &[&str]) -> Self {
        Self {
            external: external.iter().map(|s| s.to_string()).collect(),
            passes: Vec::new(),
        }
    }

    pub fn add_pass(
        &mut self,
        desc: PassDesc,
        run: impl FnMut(&mut C, &mut wgpu::CommandEncoder, &ComposeCtx) + 'static,
    ) {
        self.passes.push(Pass {
            desc,
            run: Box::new(run),
        });
    }

    /// Check that every read has an earlier writer (or is external). Run
    /// once after assembly, before the first frame.
    pub fn validate(&self) -> Result<()> {
        let mut written: Vec<&str> = self.external.iter().map(String::as_str).collect();
        for pass in &self.passes {
            for read in &pass.desc.reads {
                if !written.contains(&read.as_str()) {
                    return Err(RippleError::PassOrder {
                        pass: pass.desc.name.clone(),
                        resource: read.clone(),
                    });
                }
            }
            written.extend(pass.desc.writes.iter().map(String::as_str));
        }
        Ok(())
    }

    /// Record every pass strictly in order into one encoder.
    pub fn run(&mut self, resources: &mut C, encoder: &mut wgpu::CommandEncoder, ctx: &ComposeCtx) {
        for pass in &mut self.passes {
            (pass.run)(resources, encoder, ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(name: &str, reads: &[&str], writes: &[&str]) -> PassDesc {
        PassDesc::new(name, reads, writes)
    }

    #[test]
    fn validate_accepts_step_then_display() {
        let mut compositor: Compositor<Vec<String>> = Compositor::new(&["state.current"]);
        compositor.add_pass(desc("step", &["state.current"], &["state.next"]), |_, _, _| {});
        compositor.add_pass(desc("display", &["state.next"], &["surface"]), |_, _, _| {});
        assert!(compositor.validate().is_ok());
    }

    #[test]
    fn validate_rejects_read_before_write() {
        let mut compositor: Compositor<Vec<String>> = Compositor::new(&["state.current"]);
        compositor.add_pass(desc("display", &["state.next"], &["surface"]), |_, _, _| {});
        compositor.add_pass(desc("step", &["state.current"], &["state.next"]), |_, _, _| {});
        let err = compositor.validate().unwrap_err();
        match err {
            RippleError::PassOrder { pass, resource } => {
                assert_eq!(pass, "display");
                assert_eq!(resource, "state.next");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validate_allows_auxiliary_pass_feeding_the_step() {
        // The traffic shape: render occupancy first, step reads it.
        let mut compositor: Compositor<Vec<String>> = Compositor::new(&["state.current"]);
        compositor.add_pass(desc("grid", &["state.current"], &["grid.state"]), |_, _, _| {});
        compositor.add_pass(
            desc("step", &["state.current", "grid.state"], &["state.next"]),
            |_, _, _| {},
        );
        compositor.add_pass(desc("display", &["state.next"], &["surface"]), |_, _, _| {});
        assert!(compositor.validate().is_ok());
    }
}
