//! First-wins shadowing of colliding `define` blocks.
//!
//! Multiple fragments under composition may legitimately declare a default
//! for the same symbolic block (a layout slot, say). Rather than erroring,
//! the resolver keeps the first definition encountered in cache order
//! authoritative and renames every later one to an inert placeholder, so
//! the composed unit sees exactly one live definition per symbolic name.

use crate::tag;

use super::includer::ComposePass;

/// Rewrites shadowed `define` occurrences across the cache.
///
/// Runs once per compile pass, after the includer has fully populated the
/// cache. For every name on the symbolic reference list (including names
/// accumulated from earlier passes of the same walk), the cache is walked
/// in insertion order: the first matching define tag - lowest cache index,
/// leftmost in that fragment's source - is left untouched; each subsequent
/// occurrence is renamed to `<name>__shadowed_<n>` with a monotonically
/// increasing per-name counter.
pub fn resolve_redefinitions(pass: &mut ComposePass) {
    let symbolic = std::mem::take(&mut pass.symbolic);

    for name in &symbolic {
        let mut found = false;
        let mut shadow_idx = 0usize;

        for fragment in pass.cache.iter_mut() {
            fragment.source = tag::rewrite_defines(&fragment.source, |captured| {
                if captured != name {
                    return None;
                }
                if !found {
                    // The authoritative definition stays as-is.
                    found = true;
                    return None;
                }
                shadow_idx += 1;
                Some(format!("{}__shadowed_{}", name, shadow_idx))
            });
        }
    }

    pass.symbolic = symbolic;
}
