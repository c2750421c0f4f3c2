//! The teleporter puzzle: find the unique `p` such that the modified
//! three-argument Ackermann function, taken modulo 32768, satisfies
//! `A(4, 1, p) = 6`.
//!
//! `m` never exceeds 4 and `n` never exceeds 32767, so a flat
//! `5 * 32768`-entry table indexed `n * 5 + m` holds every memoized result
//! for one trial of `p`. The closed forms for `m in {0, 1, 2}` (spec §4.D)
//! avoid the deep recursion `m in {3, 4}` would otherwise need — callers
//! that do hit the recursive case should run on a thread with a few MiB of
//! stack headroom (spec §9).

use tracing::debug;

const MODULUS: u32 = 32768;
const TABLE_ROWS: usize = 32768;
const TABLE_COLS: usize = 5;

/// `-1` sentinel for "not yet computed", per spec §9's memo table design.
struct Memo {
    table: Vec<i32>,
}

impl Memo {
    fn new() -> Self {
        Memo {
            table: vec![-1; TABLE_ROWS * TABLE_COLS],
        }
    }

    fn get(&self, m: u32, n: u32) -> Option<u16> {
        let v = self.table[n as usize * TABLE_COLS + m as usize];
        if v < 0 {
            None
        } else {
            Some(v as u16)
        }
    }

    fn set(&mut self, m: u32, n: u32, value: u16) {
        self.table[n as usize * TABLE_COLS + m as usize] = value as i32;
    }
}

/// `A(0, n, p) = (n + 1) mod 32768`.
fn closed_form_0(n: u32) -> u32 {
    (n + 1) % MODULUS
}

/// `A(1, n, p) = (n + p + 1) mod 32768`.
fn closed_form_1(n: u32, p: u32) -> u32 {
    (n + p + 1) % MODULUS
}

/// `A(2, n, p) = ((n + 2) * p + (n + 1)) mod 32768`.
fn closed_form_2(n: u32, p: u32) -> u32 {
    ((n + 2) * p + (n + 1)) % MODULUS
}

/// Evaluate the modified Ackermann function for one `(m, n, p)`, memoizing
/// by `(m, n)` within a single trial of `p`.
fn ackermann(memo: &mut Memo, m: u32, n: u32, p: u32) -> u32 {
    if let Some(cached) = memo.get(m, n) {
        return cached as u32;
    }
    let result = match m {
        0 => closed_form_0(n),
        1 => closed_form_1(n, p),
        2 => closed_form_2(n, p),
        _ if n == 0 => ackermann(memo, m - 1, p, p),
        _ => {
            let inner = ackermann(memo, m, n - 1, p);
            ackermann(memo, m - 1, inner, p)
        }
    };
    memo.set(m, n, result as u16);
    result
}

/// Evaluate `A(m, n, p)` fresh, with its own memo table. Exposed for the
/// closed-form/recursive consistency property in spec §8.
pub fn evaluate(m: u32, n: u32, p: u32) -> u32 {
    let mut memo = Memo::new();
    ackermann(&mut memo, m, n, p)
}

/// Stack headroom for the search thread. `m in {3, 4}` recurses to a depth
/// governed by `n`, which can run into the tens of thousands — spec §9
/// calls for either a thread with several MiB of stack or an explicit work
/// stack; this takes the former, since the latter would obscure the
/// recurrence's shape for no benefit at this problem size.
const SEARCH_STACK_SIZE: usize = 64 * 1024 * 1024;

fn search() -> Option<u16> {
    for p in 0..MODULUS {
        let mut memo = Memo::new();
        let result = ackermann(&mut memo, 4, 1, p);
        if p % 4096 == 0 {
            debug!(p, result, "teleporter search progress");
        }
        if result == 6 {
            return Some(p as u16);
        }
    }
    None
}

/// Search `p` in `[0, 32768)` for the value making `A(4, 1, p) == 6`.
/// Returns the first match, which spec §4.D guarantees is unique for the
/// puzzle's reference instance. Runs on a dedicated thread with enlarged
/// stack headroom so the `m in {3, 4}` recursive branches never overflow
/// the caller's own stack.
pub fn find_teleporter_seed() -> Option<u16> {
    std::thread::Builder::new()
        .stack_size(SEARCH_STACK_SIZE)
        .spawn(search)
        .expect("failed to spawn teleporter search thread")
        .join()
        .expect("teleporter search thread panicked")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_forms_match_recursive_expansion() {
        // m=0 degenerates to the base case directly; the recursive branch
        // isn't reachable for m=0, so compare against the closed form math.
        for n in [0u32, 1, 100, 32767] {
            assert_eq!(evaluate(0, n, 7), closed_form_0(n));
        }
        for n in [0u32, 1, 100, 32767] {
            for p in [0u32, 5, 12345] {
                assert_eq!(evaluate(1, n, p), closed_form_1(n, p));
                assert_eq!(evaluate(2, n, p), closed_form_2(n, p));
            }
        }
    }

    #[test]
    fn ackermann_3_0_matches_definition() {
        // A(3, 0, p) = A(2, p, p)
        for p in [0u32, 1, 9, 500] {
            assert_eq!(evaluate(3, 0, p), closed_form_2(p, p));
        }
    }

    #[test]
    fn small_ackermann_values() {
        // A(1, 0, p) = (0 + p + 1) % 32768
        assert_eq!(evaluate(1, 0, 3), 4);
        // A(2, 0, p) = (0+2)*p + 1
        assert_eq!(evaluate(2, 0, 3), 7);
    }

    #[test]
    fn reference_instance_seed() {
        // the published reference instance's expected seed.
        assert_eq!(find_teleporter_seed(), Some(25734));
    }
}
