//! Shaders, programs and program reflection.
//!
//! Shaders are cached by stage and resolved source; programs by the resolved
//! source pair. A program holds one use of each of its two shaders, so a
//! shader lives exactly as long as some cached program links it.
//!
//! Compilation and link failures never produce a cache entry: the native
//! object is deleted, any shader acquired for the attempt is released, and
//! the driver log is returned in the error.

use crate::backend::{GlBackend, NativeHandle, gl};
use crate::binder::StateBinder;
use crate::builders::{ProgramCache, ShaderCache};
use crate::cache::keys::{ProgramKey, ShaderKey};
use crate::errors::{GlError, Result, ShaderStage};
use crate::ids::{ProgramId, ShaderId};
use crate::lifecycle::release_entry;

/// A compiled native shader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shader {
    pub handle: NativeHandle,
    pub stage: ShaderStage,
}

// ─── Reflection ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveAttribute {
    pub name: String,
    pub location: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUniform {
    pub name: String,
    pub location: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveUniformBlock {
    pub name: String,
    pub index: u32,
    pub size: i32,
}

/// Interface of a linked program, queried once after linking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgramReflection {
    pub attributes: Vec<ActiveAttribute>,
    pub uniforms: Vec<ActiveUniform>,
    pub uniform_blocks: Vec<ActiveUniformBlock>,
}

impl ProgramReflection {
    /// Arrays match by their bare name or their first element.
    #[must_use]
    pub fn uniform(&self, name: &str) -> Option<&ActiveUniform> {
        let name = base_name(name);
        self.uniforms.iter().find(|u| u.name == name)
    }

    #[must_use]
    pub fn uniform_block(&self, name: &str) -> Option<&ActiveUniformBlock> {
        let name = base_name(name);
        self.uniform_blocks.iter().find(|b| b.name == name)
    }
}

/// Drivers report arrays under the name of their first element.
fn base_name(name: &str) -> &str {
    name.strip_suffix("[0]").unwrap_or(name)
}

/// Queries the active interface of a linked program.
pub fn reflect<B: GlBackend>(gl: &mut B, program: NativeHandle) -> ProgramReflection {
    let count = |gl: &mut B, parameter| gl.get_program_parameter_i32(program, parameter).max(0) as u32;
    let mut reflection = ProgramReflection::default();

    for index in 0..count(gl, gl::ACTIVE_ATTRIBUTES) {
        if let Some(name) = gl.get_active_attribute_name(program, index) {
            // Built-ins such as gl_VertexID report location -1.
            let location = gl.get_attrib_location(program, &name);
            if location >= 0 {
                reflection.attributes.push(ActiveAttribute { name, location });
            }
        }
    }

    for index in 0..count(gl, gl::ACTIVE_UNIFORMS) {
        if let Some(name) = gl.get_active_uniform_name(program, index) {
            let location = gl.get_uniform_location(program, &name);
            if location >= 0 {
                reflection.uniforms.push(ActiveUniform { name: base_name(&name).to_string(), location });
            }
        }
    }

    for index in 0..count(gl, gl::ACTIVE_UNIFORM_BLOCKS) {
        let name = base_name(&gl.get_active_uniform_block_name(program, index)).to_string();
        let size = gl.get_active_uniform_block_size(program, index);
        reflection.uniform_blocks.push(ActiveUniformBlock { name, index, size });
    }

    reflection
}

// ─── Programs ────────────────────────────────────────────────────────────────

/// A linked native program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Program {
    pub handle: NativeHandle,
    pub reflection: ProgramReflection,
    pub(crate) shaders: [ShaderId; 2],
}

impl Program {
    /// Vertex and fragment shader cache entries this program holds a use of.
    #[must_use]
    pub fn shaders(&self) -> [ShaderId; 2] {
        self.shaders
    }
}

pub(crate) fn compile_shader<B: GlBackend>(gl: &mut B, key: &ShaderKey) -> Result<Shader> {
    let handle = gl.create_shader(key.stage.to_gl()).map_err(GlError::creation("shader"))?;
    gl.shader_source(handle, key.source.code());
    gl.compile_shader(handle);

    if !gl.shader_compile_status(handle) {
        let log = gl.shader_info_log(handle);
        gl.delete_shader(handle);
        log::debug!("{} failed to compile", key.stage);
        return Err(GlError::ShaderCompile { stage: key.stage, log });
    }

    log::debug!("Compiled {} {handle}", key.stage);
    Ok(Shader { handle, stage: key.stage })
}

fn link_program<B: GlBackend>(gl: &mut B, vertex: NativeHandle, fragment: NativeHandle) -> Result<NativeHandle> {
    let handle = gl.create_program().map_err(GlError::creation("program"))?;
    gl.attach_shader(handle, vertex);
    gl.attach_shader(handle, fragment);
    gl.link_program(handle);

    if !gl.program_link_status(handle) {
        let log = gl.program_info_log(handle);
        gl.delete_program(handle);
        return Err(GlError::ProgramLink { log });
    }

    Ok(handle)
}

fn acquire_shader<B: GlBackend>(
    gl: &mut B,
    shaders: &mut ShaderCache,
    stage: ShaderStage,
    key: &ProgramKey,
) -> Result<ShaderId> {
    let source = match stage {
        ShaderStage::Vertex => key.vertex.clone(),
        ShaderStage::Fragment => key.fragment.clone(),
    };
    shaders.get_or_create(ShaderKey { stage, source }, |k| compile_shader(gl, k))
}

/// Returns the program for `key`, compiling and linking on a miss.
///
/// Shaders are not kept past their last program: once every program using a
/// shader is released, building it again compiles it again.
pub(crate) fn acquire_program<B: GlBackend>(
    gl: &mut B,
    binder: &mut StateBinder,
    shaders: &mut ShaderCache,
    programs: &mut ProgramCache,
    key: ProgramKey,
) -> Result<ProgramId> {
    programs.get_or_create(key, |key| {
        let vertex = acquire_shader(gl, shaders, ShaderStage::Vertex, key)?;
        let fragment = match acquire_shader(gl, shaders, ShaderStage::Fragment, key) {
            Ok(id) => id,
            Err(err) => {
                release_entry(shaders, vertex, gl, binder);
                return Err(err);
            }
        };

        match link_program(gl, shaders.get(vertex).handle, shaders.get(fragment).handle) {
            Ok(handle) => {
                let reflection = reflect(gl, handle);
                log::debug!(
                    "Linked program {handle}: {} attributes, {} uniforms, {} uniform blocks",
                    reflection.attributes.len(),
                    reflection.uniforms.len(),
                    reflection.uniform_blocks.len()
                );
                Ok(Program { handle, reflection, shaders: [vertex, fragment] })
            }
            Err(err) => {
                release_entry(shaders, vertex, gl, binder);
                release_entry(shaders, fragment, gl, binder);
                Err(err)
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::cache::keys::ShaderSource;

    #[test]
    fn test_compile_failure_deletes_native_shader() {
        let mut gl = RecordingBackend::new();
        let key = ShaderKey { stage: ShaderStage::Vertex, source: ShaderSource::new("#error nope\n") };
        let err = compile_shader(&mut gl, &key).unwrap_err();

        assert!(matches!(err, GlError::ShaderCompile { stage: ShaderStage::Vertex, .. }));
        assert_eq!(gl.live_count(crate::backend::NativeObjectKind::Shader), 0);
    }

    #[test]
    fn test_reflection_skips_inactive_locations() {
        let reflection = ProgramReflection {
            attributes: vec![ActiveAttribute { name: "in_vertex".into(), location: 0 }],
            uniforms: vec![ActiveUniform { name: "Texture".into(), location: 3 }],
            uniform_blocks: vec![ActiveUniformBlock { name: "Common".into(), index: 0, size: 64 }],
        };
        assert_eq!(reflection.uniform("Texture").map(|u| u.location), Some(3));
        assert_eq!(reflection.uniform("Texture[0]").map(|u| u.location), Some(3));
        assert_eq!(reflection.uniform_block("Common").map(|b| b.size), Some(64));
        assert!(reflection.uniform("Common").is_none());
    }

    #[test]
    fn test_reflection_names_arrays_by_their_base_name() {
        let mut gl = RecordingBackend::new();
        let vertex = ShaderKey { stage: ShaderStage::Vertex, source: ShaderSource::new("void main() {}\n") };
        let fragment = ShaderKey {
            stage: ShaderStage::Fragment,
            source: ShaderSource::new("uniform sampler2D Textures[2];\nvoid main() {}\n"),
        };
        let vertex = compile_shader(&mut gl, &vertex).unwrap();
        let fragment = compile_shader(&mut gl, &fragment).unwrap();
        let program = link_program(&mut gl, vertex.handle, fragment.handle).unwrap();

        assert_eq!(gl.get_active_uniform_name(program, 0).as_deref(), Some("Textures[0]"));
        let reflection = reflect(&mut gl, program);
        assert_eq!(reflection.uniforms[0].name, "Textures");
        assert!(reflection.uniform("Textures").is_some());
    }
}
