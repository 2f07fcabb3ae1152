//! Scene layout derived from the canvas size
//!
//! Recomputed every frame so the castle tracks window resizes. All values
//! are CSS-pixel coordinates with y increasing downward.

/// Castle and ground dimensions for the current canvas size
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub w: f32,
    pub h: f32,
    /// Top of the grass band
    pub ground_y: f32,
    pub wall_top: f32,
    pub wall_height: f32,
    pub wall_bottom: f32,
    /// Guard walkway line on the wall face
    pub walkway_y: f32,
    pub tower_width: f32,
    pub tower_height: f32,
    /// Horizontal wall inset from either canvas edge
    pub tower_inset: f32,
    pub merlon_width: f32,
    pub merlon_gap: f32,
    pub gate_width: f32,
}

impl Layout {
    /// Derive the layout, guarding every dimension with a minimum so a
    /// degenerate or zero-sized canvas still yields usable geometry.
    pub fn compute(w: f32, h: f32) -> Self {
        let w = w.max(1.0);
        let h = h.max(1.0);
        let ground_y = h * 0.78;
        let wall_top = h * 0.44;
        let wall_height = (h * 0.12).max(80.0);
        let wall_bottom = wall_top + wall_height;
        let walkway_y = wall_top + wall_height * 0.32;
        let tower_width = (w * 0.06).max(60.0);
        let tower_height = (h * 0.28).max(160.0);
        let tower_inset = (w * 0.08).max(50.0);
        let merlon_width = (w * 0.012).max(10.0);
        let merlon_gap = merlon_width * 0.7;
        let gate_width = ((w - tower_inset * 2.0) * 0.14).max(70.0);
        Self {
            w,
            h,
            ground_y,
            wall_top,
            wall_height,
            wall_bottom,
            walkway_y,
            tower_width,
            tower_height,
            tower_inset,
            merlon_width,
            merlon_gap,
            gate_width,
        }
    }

    /// Left end of the guard walkway
    pub fn path_start_x(&self) -> f32 {
        self.tower_inset + 8.0
    }

    /// Right end of the guard walkway
    pub fn path_end_x(&self) -> f32 {
        self.w - self.tower_inset - 8.0
    }

    /// Walkway length the guards patrol
    pub fn path_len(&self) -> f32 {
        (self.path_end_x() - self.path_start_x()).max(0.0)
    }
}
