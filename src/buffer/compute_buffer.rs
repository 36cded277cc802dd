use crate::chain::ChainOutputs;
use crate::context::RenderContext;
use crate::error::{Error, Result};
use crate::program::{ProgramHost, Stage, UniformValue};
use crate::Core;
use std::time::Instant;

/// A compute dispatch, per §4.4's compute-buffer flow. Does not allocate
/// any textures of its own.
pub struct ComputeBuffer {
    host: ProgramHost,
    label: String,
    group_counts: (u32, u32, u32),
    pipeline: Option<wgpu::ComputePipeline>,
    started_at: Instant,
}

impl ComputeBuffer {
    pub fn new(host: ProgramHost, group_counts: (u32, u32, u32), label: impl Into<String>) -> Self {
        Self {
            host,
            label: label.into(),
            group_counts,
            pipeline: None,
            started_at: Instant::now(),
        }
    }

    pub fn host(&self) -> &ProgramHost {
        &self.host
    }

    pub fn init(&mut self, core: &Core) -> Result<()> {
        self.host.init_program(core, &self.label, Stage::Compute)?;
        let module = self.host.compute_module().expect("compute program just initialized");
        let bind_group_layout = self.host.bind_group_layout().expect("compute program just initialized");
        let layout = core.device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{}/pipeline_layout", self.label)),
            bind_group_layouts: &[bind_group_layout],
            push_constant_ranges: &[],
        });
        self.pipeline = Some(core.device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(&format!("{}/pipeline", self.label)),
            layout: Some(&layout),
            module,
            entry_point: Some("cs_main"),
            compilation_options: Default::default(),
            cache: None,
        }));
        log::debug!(
            "{}: compute program linked with {} active uniforms",
            self.label,
            self.host.interface().map(|i| i.uniforms().len()).unwrap_or(0)
        );
        Ok(())
    }

    pub fn dispatch(
        &mut self,
        core: &Core,
        ctx: &RenderContext,
        chain: &ChainOutputs,
        encoder: &mut wgpu::CommandEncoder,
    ) -> Result<()> {
        let pipeline = self.pipeline.as_ref().ok_or(Error::NullResource("ComputeBuffer::pipeline"))?;
        let bind_group = self.host.prepare_render(core, ctx, chain, &self.label)?;
        self.host.set_uniform(core, "iTime", UniformValue::Float(self.started_at.elapsed().as_secs_f32()))?;

        let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
            label: Some(&format!("{}/pass", self.label)),
            timestamp_writes: None,
        });
        pass.set_pipeline(pipeline);
        pass.set_bind_group(0, &bind_group, &[]);
        let (x, y, z) = self.group_counts;
        pass.dispatch_workgroups(x, y, z);
        Ok(())
    }
}
