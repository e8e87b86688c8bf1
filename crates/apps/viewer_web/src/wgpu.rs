#[cfg(target_arch = "wasm32")]
mod imp {
    use ::wgpu::util::DeviceExt;
    use foundation::Rgba;
    use gpu::{
        BlendMode, CanvasSize, DepthMode, DrawCall, GlState, MeshData, MeshHandle, RenderBackend,
        Shading,
    };
    use std::borrow::Cow;
    use std::collections::HashMap;
    use wasm_bindgen::JsCast;

    use crate::error::ViewerError;

    const MESH_SHADER: &str = r#"
struct Draw {
    mvp: mat4x4<f32>,
    color: vec4<f32>,
    // xyz: direction towards the light, w: 1 when lit.
    light: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> draw: Draw;

struct VsOut {
    @builtin(position) pos: vec4<f32>,
    @location(0) normal: vec3<f32>,
};

@vertex
fn vs_main(@location(0) position: vec3<f32>, @location(1) normal: vec3<f32>) -> VsOut {
    var pos = draw.mvp * vec4<f32>(position, 1.0);
    // Matrices are built for a [-1, 1] depth range.
    pos.z = 0.5 * (pos.z + pos.w);
    return VsOut(pos, normal);
}

@fragment
fn fs_main(fs_in: VsOut) -> @location(0) vec4<f32> {
    if (draw.light.w == 0.0) {
        return draw.color;
    }
    let n = normalize(fs_in.normal);
    let ndotl = abs(dot(n, normalize(draw.light.xyz)));
    let shade = 0.55 + 0.45 * ndotl;
    return vec4<f32>(draw.color.rgb * shade, draw.color.a);
}
"#;

    const LIGHT_DIR: [f32; 3] = [0.35, -0.45, 0.82];
    const MSAA_SAMPLES: u32 = 4;

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct Vertex {
        position: [f32; 3],
        normal: [f32; 3],
    }

    #[repr(C)]
    #[derive(Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
    struct DrawUniforms {
        mvp: [[f32; 4]; 4],
        color: [f32; 4],
        light: [f32; 4],
    }

    struct GpuMesh {
        vertex_buffer: ::wgpu::Buffer,
        index_buffer: ::wgpu::Buffer,
        index_count: u32,
    }

    struct QueuedDraw {
        mesh: MeshHandle,
        state: GlState,
        offset: u32,
    }

    /// Browser-side [`RenderBackend`]: WebGPU when available, WebGL2 otherwise.
    pub struct WgpuBackend {
        _instance: &'static ::wgpu::Instance,
        surface: ::wgpu::Surface<'static>,
        device: ::wgpu::Device,
        queue: ::wgpu::Queue,
        config: ::wgpu::SurfaceConfiguration,
        canvas: web_sys::HtmlCanvasElement,
        shader: ::wgpu::ShaderModule,
        bind_group_layout: ::wgpu::BindGroupLayout,
        pipeline_layout: ::wgpu::PipelineLayout,
        pipelines: HashMap<GlState, ::wgpu::RenderPipeline>,
        uniform_buffer: ::wgpu::Buffer,
        uniform_bind_group: ::wgpu::BindGroup,
        uniform_stride: u32,
        depth_view: ::wgpu::TextureView,
        msaa_view: Option<::wgpu::TextureView>,
        sample_count: u32,
        meshes: HashMap<MeshHandle, GpuMesh>,
        next_mesh: u32,
        state: GlState,
        clear: Option<Rgba>,
        uniforms: Vec<u8>,
        queued: Vec<QueuedDraw>,
    }

    fn align_to(value: u32, alignment: u32) -> u32 {
        value.div_ceil(alignment) * alignment
    }

    fn create_depth_view(
        device: &::wgpu::Device,
        config: &::wgpu::SurfaceConfiguration,
        sample_count: u32,
    ) -> ::wgpu::TextureView {
        let tex = device.create_texture(&::wgpu::TextureDescriptor {
            label: Some("glowmap-depth"),
            size: ::wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: ::wgpu::TextureDimension::D2,
            format: ::wgpu::TextureFormat::Depth24Plus,
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        tex.create_view(&::wgpu::TextureViewDescriptor::default())
    }

    fn create_msaa_view(
        device: &::wgpu::Device,
        config: &::wgpu::SurfaceConfiguration,
        sample_count: u32,
    ) -> Option<::wgpu::TextureView> {
        if sample_count <= 1 {
            return None;
        }
        let tex = device.create_texture(&::wgpu::TextureDescriptor {
            label: Some("glowmap-msaa-color"),
            size: ::wgpu::Extent3d {
                width: config.width.max(1),
                height: config.height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count,
            dimension: ::wgpu::TextureDimension::D2,
            format: config.format,
            usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
            view_formats: &[],
        });
        Some(tex.create_view(&::wgpu::TextureViewDescriptor::default()))
    }

    fn create_uniforms(
        device: &::wgpu::Device,
        layout: &::wgpu::BindGroupLayout,
        size: u64,
    ) -> (::wgpu::Buffer, ::wgpu::BindGroup) {
        let buffer = device.create_buffer(&::wgpu::BufferDescriptor {
            label: Some("glowmap-draw-uniforms"),
            size,
            usage: ::wgpu::BufferUsages::UNIFORM | ::wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&::wgpu::BindGroupDescriptor {
            label: Some("glowmap-draw-bg"),
            layout,
            entries: &[::wgpu::BindGroupEntry {
                binding: 0,
                resource: ::wgpu::BindingResource::Buffer(::wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: ::wgpu::BufferSize::new(std::mem::size_of::<DrawUniforms>() as u64),
                }),
            }],
        });
        (buffer, bind_group)
    }

    fn depth_stencil_for(depth: DepthMode) -> ::wgpu::DepthStencilState {
        let (depth_write_enabled, depth_compare) = match depth {
            DepthMode::Disabled => (false, ::wgpu::CompareFunction::Always),
            DepthMode::ReadOnly => (false, ::wgpu::CompareFunction::LessEqual),
            DepthMode::ReadWrite => (true, ::wgpu::CompareFunction::LessEqual),
        };
        ::wgpu::DepthStencilState {
            format: ::wgpu::TextureFormat::Depth24Plus,
            depth_write_enabled,
            depth_compare,
            stencil: ::wgpu::StencilState::default(),
            bias: ::wgpu::DepthBiasState::default(),
        }
    }

    impl WgpuBackend {
        pub async fn from_canvas_id(
            canvas_id: &str,
            antialias: bool,
        ) -> Result<WgpuBackend, ViewerError> {
            let window =
                web_sys::window().ok_or_else(|| ViewerError::Dom("window missing".to_string()))?;
            let document = window
                .document()
                .ok_or_else(|| ViewerError::Dom("document missing".to_string()))?;
            let canvas = document
                .get_element_by_id(canvas_id)
                .ok_or_else(|| ViewerError::Dom(format!("canvas #{canvas_id} missing")))?
                .dyn_into::<web_sys::HtmlCanvasElement>()
                .map_err(|_| ViewerError::Dom(format!("#{canvas_id} is not a canvas")))?;

            let width = canvas.width().max(1);
            let height = canvas.height().max(1);

            // A `Surface` must not outlive its `Instance`; the instance lives
            // as long as the page.
            let instance: &'static ::wgpu::Instance = Box::leak(Box::new(
                ::wgpu::Instance::new(&::wgpu::InstanceDescriptor {
                    backends: ::wgpu::Backends::BROWSER_WEBGPU | ::wgpu::Backends::GL,
                    ..Default::default()
                }),
            ));

            let surface = instance
                .create_surface(::wgpu::SurfaceTarget::Canvas(canvas.clone()))
                .map_err(|e| ViewerError::Gpu(format!("surface error: {e}")))?;

            let adapter = instance
                .request_adapter(&::wgpu::RequestAdapterOptions {
                    power_preference: ::wgpu::PowerPreference::HighPerformance,
                    compatible_surface: Some(&surface),
                    force_fallback_adapter: false,
                })
                .await
                .map_err(|e| ViewerError::Gpu(format!("adapter error: {e}")))?;

            let (device, queue) = adapter
                .request_device(&::wgpu::DeviceDescriptor {
                    label: Some("glowmap-device"),
                    required_features: ::wgpu::Features::empty(),
                    required_limits: ::wgpu::Limits::downlevel_webgl2_defaults(),
                    ..Default::default()
                })
                .await
                .map_err(|e| ViewerError::Gpu(format!("device error: {e}")))?;

            let caps = surface.get_capabilities(&adapter);
            // Paint colors are authored as plain hex; keep them unconverted.
            let format = caps
                .formats
                .iter()
                .copied()
                .find(|f| !f.is_srgb())
                .or_else(|| caps.formats.first().copied())
                .ok_or_else(|| ViewerError::Gpu("surface has no formats".to_string()))?;
            let alpha_mode = caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(::wgpu::CompositeAlphaMode::Auto);

            let config = ::wgpu::SurfaceConfiguration {
                usage: ::wgpu::TextureUsages::RENDER_ATTACHMENT,
                format,
                width,
                height,
                desired_maximum_frame_latency: 2,
                present_mode: ::wgpu::PresentMode::Fifo,
                alpha_mode,
                view_formats: vec![],
            };
            surface.configure(&device, &config);

            let sample_count = if antialias { MSAA_SAMPLES } else { 1 };
            let depth_view = create_depth_view(&device, &config, sample_count);
            let msaa_view = create_msaa_view(&device, &config, sample_count);

            let shader = device.create_shader_module(::wgpu::ShaderModuleDescriptor {
                label: Some("glowmap-mesh-shader"),
                source: ::wgpu::ShaderSource::Wgsl(Cow::Borrowed(MESH_SHADER)),
            });

            // WebGL2 has no storage buffers; per-draw data uses a dynamic
            // offset into one uniform buffer.
            let bind_group_layout =
                device.create_bind_group_layout(&::wgpu::BindGroupLayoutDescriptor {
                    label: Some("glowmap-draw-bgl"),
                    entries: &[::wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: ::wgpu::ShaderStages::VERTEX_FRAGMENT,
                        ty: ::wgpu::BindingType::Buffer {
                            ty: ::wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: true,
                            min_binding_size: ::wgpu::BufferSize::new(
                                std::mem::size_of::<DrawUniforms>() as u64,
                            ),
                        },
                        count: None,
                    }],
                });

            let pipeline_layout =
                device.create_pipeline_layout(&::wgpu::PipelineLayoutDescriptor {
                    label: Some("glowmap-mesh-pipeline-layout"),
                    bind_group_layouts: &[&bind_group_layout],
                    immediate_size: 0,
                });

            let uniform_stride = align_to(
                std::mem::size_of::<DrawUniforms>() as u32,
                device.limits().min_uniform_buffer_offset_alignment,
            );
            let (uniform_buffer, uniform_bind_group) =
                create_uniforms(&device, &bind_group_layout, uniform_stride as u64 * 64);

            tracing::info!(
                width,
                height,
                ?format,
                backend = ?adapter.get_info().backend,
                sample_count,
                "wgpu context ready"
            );

            Ok(WgpuBackend {
                _instance: instance,
                surface,
                device,
                queue,
                config,
                canvas,
                shader,
                bind_group_layout,
                pipeline_layout,
                pipelines: HashMap::new(),
                uniform_buffer,
                uniform_bind_group,
                uniform_stride,
                depth_view,
                msaa_view,
                sample_count,
                meshes: HashMap::new(),
                next_mesh: 0,
                state: GlState::default(),
                clear: None,
                uniforms: Vec::new(),
                queued: Vec::new(),
            })
        }

        fn ensure_pipeline(&mut self, state: GlState) {
            if self.pipelines.contains_key(&state) {
                return;
            }
            let blend = match state.blend {
                BlendMode::Replace => ::wgpu::BlendState::REPLACE,
                BlendMode::Alpha => ::wgpu::BlendState::ALPHA_BLENDING,
            };
            let pipeline = self
                .device
                .create_render_pipeline(&::wgpu::RenderPipelineDescriptor {
                    label: Some("glowmap-mesh-pipeline"),
                    layout: Some(&self.pipeline_layout),
                    vertex: ::wgpu::VertexState {
                        module: &self.shader,
                        entry_point: Some("vs_main"),
                        compilation_options: Default::default(),
                        buffers: &[::wgpu::VertexBufferLayout {
                            array_stride: std::mem::size_of::<Vertex>() as ::wgpu::BufferAddress,
                            step_mode: ::wgpu::VertexStepMode::Vertex,
                            attributes: &[
                                ::wgpu::VertexAttribute {
                                    format: ::wgpu::VertexFormat::Float32x3,
                                    offset: 0,
                                    shader_location: 0,
                                },
                                ::wgpu::VertexAttribute {
                                    format: ::wgpu::VertexFormat::Float32x3,
                                    offset: 12,
                                    shader_location: 1,
                                },
                            ],
                        }],
                    },
                    fragment: Some(::wgpu::FragmentState {
                        module: &self.shader,
                        entry_point: Some("fs_main"),
                        compilation_options: Default::default(),
                        targets: &[Some(::wgpu::ColorTargetState {
                            format: self.config.format,
                            blend: Some(blend),
                            write_mask: ::wgpu::ColorWrites::ALL,
                        })],
                    }),
                    primitive: ::wgpu::PrimitiveState {
                        topology: ::wgpu::PrimitiveTopology::TriangleList,
                        strip_index_format: None,
                        front_face: ::wgpu::FrontFace::Ccw,
                        cull_mode: state.cull_back_faces.then_some(::wgpu::Face::Back),
                        polygon_mode: ::wgpu::PolygonMode::Fill,
                        unclipped_depth: false,
                        conservative: false,
                    },
                    depth_stencil: Some(depth_stencil_for(state.depth)),
                    multisample: ::wgpu::MultisampleState {
                        count: self.sample_count,
                        ..Default::default()
                    },
                    multiview_mask: None,
                    cache: None,
                });
            tracing::debug!(?state, "pipeline created");
            self.pipelines.insert(state, pipeline);
        }

        fn ensure_uniform_capacity(&mut self) {
            let needed = self.uniforms.len() as u64;
            if needed <= self.uniform_buffer.size() {
                return;
            }
            let size = needed.next_power_of_two();
            let (buffer, bind_group) = create_uniforms(&self.device, &self.bind_group_layout, size);
            self.uniform_buffer.destroy();
            self.uniform_buffer = buffer;
            self.uniform_bind_group = bind_group;
        }

        fn discard_frame(&mut self) {
            self.clear = None;
            self.uniforms.clear();
            self.queued.clear();
        }
    }

    impl RenderBackend for WgpuBackend {
        fn canvas(&self) -> CanvasSize {
            CanvasSize::new(self.config.width, self.config.height)
        }

        fn resize(&mut self, size: CanvasSize) {
            let width = size.width.max(1);
            let height = size.height.max(1);
            if width == self.config.width && height == self.config.height {
                return;
            }
            self.canvas.set_width(width);
            self.canvas.set_height(height);
            self.config.width = width;
            self.config.height = height;
            self.surface.configure(&self.device, &self.config);
            self.depth_view = create_depth_view(&self.device, &self.config, self.sample_count);
            self.msaa_view = create_msaa_view(&self.device, &self.config, self.sample_count);
        }

        fn begin_frame(&mut self, clear: Rgba) {
            self.discard_frame();
            self.clear = Some(clear);
        }

        fn end_frame(&mut self) {
            let Some(clear) = self.clear.take() else {
                tracing::warn!("end_frame without begin_frame");
                return;
            };

            let states: Vec<GlState> = self.queued.iter().map(|d| d.state).collect();
            for state in states {
                self.ensure_pipeline(state);
            }
            self.ensure_uniform_capacity();
            if !self.uniforms.is_empty() {
                self.queue
                    .write_buffer(&self.uniform_buffer, 0, &self.uniforms);
            }

            let frame = match self.surface.get_current_texture() {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(error = %e, "surface texture unavailable, dropping frame");
                    self.surface.configure(&self.device, &self.config);
                    self.discard_frame();
                    return;
                }
            };
            let view = frame
                .texture
                .create_view(&::wgpu::TextureViewDescriptor::default());
            let (target, resolve_target) = match &self.msaa_view {
                Some(msaa) => (msaa, Some(&view)),
                None => (&view, None),
            };

            let mut encoder = self
                .device
                .create_command_encoder(&::wgpu::CommandEncoderDescriptor {
                    label: Some("glowmap-encoder"),
                });
            {
                let mut rpass = encoder.begin_render_pass(&::wgpu::RenderPassDescriptor {
                    label: Some("glowmap-pass"),
                    color_attachments: &[Some(::wgpu::RenderPassColorAttachment {
                        view: target,
                        depth_slice: None,
                        resolve_target,
                        ops: ::wgpu::Operations {
                            load: ::wgpu::LoadOp::Clear(::wgpu::Color {
                                r: clear.r as f64,
                                g: clear.g as f64,
                                b: clear.b as f64,
                                a: clear.a as f64,
                            }),
                            store: ::wgpu::StoreOp::Store,
                        },
                    })],
                    depth_stencil_attachment: Some(::wgpu::RenderPassDepthStencilAttachment {
                        view: &self.depth_view,
                        depth_ops: Some(::wgpu::Operations {
                            load: ::wgpu::LoadOp::Clear(1.0),
                            store: ::wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }),
                    occlusion_query_set: None,
                    timestamp_writes: None,
                    multiview_mask: None,
                });

                for draw in &self.queued {
                    let (Some(pipeline), Some(mesh)) =
                        (self.pipelines.get(&draw.state), self.meshes.get(&draw.mesh))
                    else {
                        continue;
                    };
                    rpass.set_pipeline(pipeline);
                    rpass.set_bind_group(0, &self.uniform_bind_group, &[draw.offset]);
                    rpass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                    rpass.set_index_buffer(mesh.index_buffer.slice(..), ::wgpu::IndexFormat::Uint32);
                    rpass.draw_indexed(0..mesh.index_count, 0, 0..1);
                }
            }

            self.queue.submit(Some(encoder.finish()));
            frame.present();
            self.discard_frame();
        }

        fn state(&self) -> GlState {
            self.state
        }

        fn set_state(&mut self, state: GlState) {
            self.state = state;
        }

        fn upload_mesh(&mut self, mesh: &MeshData) -> MeshHandle {
            let vertices: Vec<Vertex> = mesh
                .positions
                .iter()
                .zip(&mesh.normals)
                .map(|(&position, &normal)| Vertex { position, normal })
                .collect();
            let vertex_buffer = self
                .device
                .create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                    label: Some("glowmap-mesh-vertices"),
                    contents: bytemuck::cast_slice(&vertices),
                    usage: ::wgpu::BufferUsages::VERTEX,
                });
            let index_buffer = self
                .device
                .create_buffer_init(&::wgpu::util::BufferInitDescriptor {
                    label: Some("glowmap-mesh-indices"),
                    contents: bytemuck::cast_slice(&mesh.indices),
                    usage: ::wgpu::BufferUsages::INDEX,
                });

            let handle = MeshHandle(self.next_mesh);
            self.next_mesh += 1;
            self.meshes.insert(
                handle,
                GpuMesh {
                    vertex_buffer,
                    index_buffer,
                    index_count: mesh.indices.len() as u32,
                },
            );
            handle
        }

        fn release_mesh(&mut self, mesh: MeshHandle) {
            match self.meshes.remove(&mesh) {
                Some(gpu_mesh) => {
                    gpu_mesh.vertex_buffer.destroy();
                    gpu_mesh.index_buffer.destroy();
                }
                None => tracing::warn!(?mesh, "release of unknown mesh"),
            }
        }

        fn draw(&mut self, call: &DrawCall) {
            if self.clear.is_none() || !self.meshes.contains_key(&call.mesh) {
                return;
            }
            let light = match call.shading {
                Shading::Unlit => [0.0; 4],
                Shading::Lambert => [LIGHT_DIR[0], LIGHT_DIR[1], LIGHT_DIR[2], 1.0],
            };
            let uniforms = DrawUniforms {
                mvp: call.mvp().to_cols_f32(),
                color: call.color.to_array(),
                light,
            };
            let offset = self.uniforms.len() as u32;
            self.uniforms.extend_from_slice(bytemuck::bytes_of(&uniforms));
            self.uniforms
                .resize(offset as usize + self.uniform_stride as usize, 0);
            self.queued.push(QueuedDraw {
                mesh: call.mesh,
                state: self.state,
                offset,
            });
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use foundation::Rgba;
    use gpu::{CanvasSize, DrawCall, GlState, MeshData, MeshHandle, RenderBackend};

    use crate::error::ViewerError;

    /// Off the web there is no canvas to draw into, so no value exists.
    pub enum WgpuBackend {}

    impl WgpuBackend {
        pub async fn from_canvas_id(
            canvas_id: &str,
            _antialias: bool,
        ) -> Result<WgpuBackend, ViewerError> {
            Err(ViewerError::Gpu(format!(
                "canvas #{canvas_id}: browser rendering requires a wasm32 target"
            )))
        }
    }

    impl RenderBackend for WgpuBackend {
        fn canvas(&self) -> CanvasSize {
            match *self {}
        }

        fn resize(&mut self, _size: CanvasSize) {
            match *self {}
        }

        fn begin_frame(&mut self, _clear: Rgba) {
            match *self {}
        }

        fn end_frame(&mut self) {
            match *self {}
        }

        fn state(&self) -> GlState {
            match *self {}
        }

        fn set_state(&mut self, _state: GlState) {
            match *self {}
        }

        fn upload_mesh(&mut self, _mesh: &MeshData) -> MeshHandle {
            match *self {}
        }

        fn release_mesh(&mut self, _mesh: MeshHandle) {
            match *self {}
        }

        fn draw(&mut self, _call: &DrawCall) {
            match *self {}
        }
    }

}

pub use imp::WgpuBackend;
