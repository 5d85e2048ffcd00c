use bitflags::bitflags;

bitflags! {
    /// Single-bit fields of the packed action state. Bit positions are wire-visible.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ActionButtons: u16 {
        const FIRE = 1 << 12;
        const THRUST = 1 << 13;
        const WARP = 1 << 14;
        const USE_ITEM = 1 << 15;
    }
}

bitflags! {
    /// Momentary actions raised on a 0 -> 1 transition of their bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ActionTriggers: u8 {
        const WARP = 1 << 0;
        const USE_ITEM = 1 << 1;
    }
}

impl Default for ActionTriggers {
    fn default() -> Self {
        Self::empty()
    }
}

const AXIS_BITS: u32 = 6;
const AXIS_MAX: u16 = (1 << AXIS_BITS) - 1;
const LEFT_SHIFT: u32 = 0;
const RIGHT_SHIFT: u32 = AXIS_BITS;

/// Packed 16-bit input of one ship: `left:6 | right:6 | fire | thrust | warp | use_item`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionState {
    bits: u16,
    triggers: ActionTriggers,
}

impl PartialEq for ActionState {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl Eq for ActionState {}

impl ActionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a state from raw bits without raising any trigger.
    pub fn from_bits(bits: u16) -> Self {
        Self {
            bits,
            triggers: ActionTriggers::empty(),
        }
    }

    #[inline]
    pub fn state(&self) -> u16 {
        self.bits
    }

    /// Replaces the whole state, raising triggers for rising warp/use-item edges.
    pub fn set_state(&mut self, bits: u16) {
        let rising = ActionButtons::from_bits_truncate(bits & !self.bits);
        if rising.contains(ActionButtons::WARP) {
            self.triggers |= ActionTriggers::WARP;
        }
        if rising.contains(ActionButtons::USE_ITEM) {
            self.triggers |= ActionTriggers::USE_ITEM;
        }
        self.bits = bits;
    }

    pub fn left(&self) -> f32 {
        self.axis(LEFT_SHIFT) as f32 / AXIS_MAX as f32
    }

    pub fn set_left(&mut self, value: f32) {
        self.set_axis(LEFT_SHIFT, value);
    }

    pub fn right(&self) -> f32 {
        self.axis(RIGHT_SHIFT) as f32 / AXIS_MAX as f32
    }

    pub fn set_right(&mut self, value: f32) {
        self.set_axis(RIGHT_SHIFT, value);
    }

    pub fn is_firing(&self) -> bool {
        self.has_button(ActionButtons::FIRE)
    }

    pub fn set_firing(&mut self, enable: bool) {
        self.set_button(ActionButtons::FIRE, enable);
    }

    pub fn is_thrusting(&self) -> bool {
        self.has_button(ActionButtons::THRUST)
    }

    pub fn set_thrusting(&mut self, enable: bool) {
        self.set_button(ActionButtons::THRUST, enable);
    }

    pub fn is_warping(&self) -> bool {
        self.has_button(ActionButtons::WARP)
    }

    pub fn set_warp(&mut self, enable: bool) {
        if enable && !self.is_warping() {
            self.triggers |= ActionTriggers::WARP;
        }
        self.set_button(ActionButtons::WARP, enable);
    }

    pub fn is_using_item(&self) -> bool {
        self.has_button(ActionButtons::USE_ITEM)
    }

    pub fn set_use_item(&mut self, enable: bool) {
        if enable && !self.is_using_item() {
            self.triggers |= ActionTriggers::USE_ITEM;
        }
        self.set_button(ActionButtons::USE_ITEM, enable);
    }

    /// Returns the triggers raised since the last call and clears them.
    pub fn take_triggers(&mut self) -> ActionTriggers {
        std::mem::take(&mut self.triggers)
    }

    pub fn pending_triggers(&self) -> ActionTriggers {
        self.triggers
    }

    #[inline]
    fn has_button(&self, button: ActionButtons) -> bool {
        self.bits & button.bits() != 0
    }

    #[inline]
    fn set_button(&mut self, button: ActionButtons, enable: bool) {
        if enable {
            self.bits |= button.bits();
        } else {
            self.bits &= !button.bits();
        }
    }

    fn axis(&self, shift: u32) -> u16 {
        (self.bits >> shift) & AXIS_MAX
    }

    fn set_axis(&mut self, shift: u32, value: f32) {
        // clamp first so an out-of-range value cannot spill into the neighbouring field
        let quantized = (value.clamp(0.0, 1.0) * AXIS_MAX as f32).round() as u16 & AXIS_MAX;
        self.bits = (self.bits & !(AXIS_MAX << shift)) | (quantized << shift);
    }
}
