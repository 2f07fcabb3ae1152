//! Audio system using Web Audio API
//!
//! Procedurally generated sound effects - no external files needed. The
//! context is created lazily and every call degrades to a no-op when the
//! browser refuses to provide one.

use web_sys::{AudioContext, GainNode, OscillatorNode, OscillatorType};

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoundEffect {
    /// Balloon popped under the pointer
    BalloonPop,
    /// Wall cannon fired
    CannonFire,
    /// Cannonball hit the valley floor
    CannonImpact,
}

/// Audio manager for both scenes
pub struct AudioManager {
    ctx: Option<AudioContext>,
    muted: bool,
}

impl Default for AudioManager {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioManager {
    pub fn new() -> Self {
        // May fail outside a secure context; sound then stays off
        let ctx = AudioContext::new().ok();
        if ctx.is_none() {
            log::warn!("Failed to create AudioContext - audio disabled");
        }
        Self { ctx, muted: false }
    }

    /// Resume the context (required after a user gesture)
    pub fn resume(&self) {
        if let Some(ctx) = &self.ctx {
            let _ = ctx.resume();
        }
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn muted(&self) -> bool {
        self.muted
    }

    /// Play a sound effect
    pub fn play(&self, effect: SoundEffect) {
        if self.muted {
            return;
        }
        let Some(ctx) = &self.ctx else { return };

        if ctx.state() == web_sys::AudioContextState::Suspended {
            let _ = ctx.resume();
        }

        match effect {
            SoundEffect::BalloonPop => self.play_pop(ctx),
            SoundEffect::CannonFire => self.play_cannon_fire(ctx),
            SoundEffect::CannonImpact => self.play_cannon_impact(ctx),
        }
    }

    /// Create an oscillator with a gain envelope attached to the output
    fn create_osc(
        &self,
        ctx: &AudioContext,
        freq: f32,
        osc_type: OscillatorType,
    ) -> Option<(OscillatorNode, GainNode)> {
        let osc = ctx.create_oscillator().ok()?;
        let gain = ctx.create_gain().ok()?;

        osc.set_type(osc_type);
        osc.frequency().set_value(freq);
        osc.connect_with_audio_node(&gain).ok()?;
        gain.connect_with_audio_node(&ctx.destination()).ok()?;

        Some((osc, gain))
    }

    /// Pop - short shaped noise burst plus a falling blip
    fn play_pop(&self, ctx: &AudioContext) {
        let t = ctx.current_time();

        // Noise burst, softened toward the tail
        let sample_rate = ctx.sample_rate();
        let len = (sample_rate * 0.06) as u32;
        if let Ok(buffer) = ctx.create_buffer(1, len, sample_rate) {
            let mut data = vec![0.0f32; len as usize];
            for (i, sample) in data.iter_mut().enumerate() {
                let envelope = (1.0 - i as f32 / len as f32).powf(0.6);
                *sample = (js_sys::Math::random() as f32 * 2.0 - 1.0) * envelope;
            }
            let _ = buffer.copy_to_channel(&mut data, 0);

            if let (Ok(src), Ok(gain)) = (ctx.create_buffer_source(), ctx.create_gain()) {
                src.set_buffer(Some(&buffer));
                let connected = src.connect_with_audio_node(&gain).is_ok()
                    && gain.connect_with_audio_node(&ctx.destination()).is_ok();
                if connected {
                    gain.gain().set_value_at_time(0.001, t).ok();
                    gain.gain()
                        .exponential_ramp_to_value_at_time(0.2, t + 0.005)
                        .ok();
                    gain.gain()
                        .exponential_ramp_to_value_at_time(0.0001, t + 0.06)
                        .ok();
                    src.start().ok();
                    src.stop_with_when(t + 0.07).ok();
                }
            }
        }

        // Pitch blip sliding down
        if let Some((osc, gain)) = self.create_osc(ctx, 900.0, OscillatorType::Triangle) {
            gain.gain().set_value_at_time(0.0001, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.25, t + 0.008)
                .ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.0001, t + 0.12)
                .ok();
            osc.frequency().set_value_at_time(900.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(200.0, t + 0.08)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.14).ok();
        }
    }

    /// Cannon fire - distant boom with a sharp crack on top
    fn play_cannon_fire(&self, ctx: &AudioContext) {
        let t = ctx.current_time();

        if let Some((osc, gain)) = self.create_osc(ctx, 90.0, OscillatorType::Sawtooth) {
            gain.gain().set_value_at_time(0.35, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.5)
                .ok();
            osc.frequency().set_value_at_time(90.0, t).ok();
            osc.frequency()
                .exponential_ramp_to_value_at_time(35.0, t + 0.5)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.6).ok();
        }

        if let Some((osc, gain)) = self.create_osc(ctx, 700.0, OscillatorType::Square) {
            gain.gain().set_value_at_time(0.12, t).ok();
            gain.gain()
                .exponential_ramp_to_value_at_time(0.01, t + 0.08)
                .ok();
            osc.start().ok();
            osc.stop_with_when(t + 0.1).ok();
        }
    }

    /// Impact - dull thud where the shot lands
    fn play_cannon_impact(&self, ctx: &AudioContext) {
        let Some((osc, gain)) = self.create_osc(ctx, 70.0, OscillatorType::Sine) else {
            return;
        };
        let t = ctx.current_time();

        gain.gain().set_value_at_time(0.3, t).ok();
        gain.gain()
            .exponential_ramp_to_value_at_time(0.01, t + 0.25)
            .ok();
        osc.frequency().set_value_at_time(70.0, t).ok();
        osc.frequency()
            .exponential_ramp_to_value_at_time(40.0, t + 0.2)
            .ok();

        osc.start().ok();
        osc.stop_with_when(t + 0.3).ok();
    }
}
