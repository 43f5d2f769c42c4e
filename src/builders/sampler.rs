//! Samplers.

use crate::backend::{GlBackend, NativeHandle, gl};
use crate::cache::keys::SamplerKey;
use crate::errors::{GlError, Result};

/// A native sampler object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sampler {
    pub handle: NativeHandle,
}

pub(crate) fn build_sampler<B: GlBackend>(gl: &mut B, key: &SamplerKey) -> Result<Sampler> {
    let handle = gl.create_sampler().map_err(GlError::creation("sampler"))?;

    gl.sampler_parameter_i32(handle, gl::TEXTURE_MIN_FILTER, key.min_filter.to_gl() as i32);
    gl.sampler_parameter_i32(handle, gl::TEXTURE_MAG_FILTER, key.mag_filter.to_gl() as i32);
    gl.sampler_parameter_f32(handle, gl::TEXTURE_MIN_LOD, key.min_lod());
    gl.sampler_parameter_f32(handle, gl::TEXTURE_MAX_LOD, key.max_lod());

    // Not every driver exposes LOD bias, only touch it when asked to.
    if key.lod_bias() != 0.0 {
        gl.sampler_parameter_f32(handle, gl::TEXTURE_LOD_BIAS, key.lod_bias());
    }

    let [s, t, r] = key.wrap;
    gl.sampler_parameter_i32(handle, gl::TEXTURE_WRAP_S, s.to_gl() as i32);
    gl.sampler_parameter_i32(handle, gl::TEXTURE_WRAP_T, t.to_gl() as i32);
    gl.sampler_parameter_i32(handle, gl::TEXTURE_WRAP_R, r.to_gl() as i32);

    match key.compare {
        Some(func) => {
            gl.sampler_parameter_i32(handle, gl::TEXTURE_COMPARE_MODE, gl::COMPARE_REF_TO_TEXTURE as i32);
            gl.sampler_parameter_i32(handle, gl::TEXTURE_COMPARE_FUNC, func.to_gl() as i32);
        }
        None => gl.sampler_parameter_i32(handle, gl::TEXTURE_COMPARE_MODE, gl::NONE as i32),
    }

    gl.sampler_parameter_f32_slice(handle, gl::TEXTURE_BORDER_COLOR, &key.border_color());

    log::debug!("Created sampler {handle}");
    Ok(Sampler { handle })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{GlCall, RecordingBackend};
    use crate::resources::state::{CompareFunc, SamplerParams};

    #[test]
    fn test_compare_sampler_sets_compare_mode() {
        let mut gl = RecordingBackend::new();
        let params = SamplerParams { compare: Some(CompareFunc::LessEqual), ..Default::default() };
        let sampler = build_sampler(&mut gl, &SamplerKey::from(&params)).unwrap();

        assert!(gl.calls().contains(&GlCall::SamplerParameterI32 {
            sampler: sampler.handle,
            parameter: gl::TEXTURE_COMPARE_FUNC,
            value: gl::LEQUAL as i32,
        }));
    }

    #[test]
    fn test_zero_lod_bias_is_not_sent() {
        let mut gl = RecordingBackend::new();
        build_sampler(&mut gl, &SamplerKey::from(&SamplerParams::default())).unwrap();
        let bias_calls = gl.count(|call| {
            matches!(call, GlCall::SamplerParameterF32 { parameter, .. } if *parameter == gl::TEXTURE_LOD_BIAS)
        });
        assert_eq!(bias_calls, 0);
    }
}
