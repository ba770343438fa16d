use tutor_core::ports::RandomSource;

/// `Math.random()`; the reveal jitter does not need anything stronger.
pub struct JsRandom;

impl RandomSource for JsRandom {
    fn next_unit(&self) -> f64 {
        js_sys::Math::random()
    }
}
