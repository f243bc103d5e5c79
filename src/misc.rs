// SPDX-License-Identifier: GPL-3.0-or-later

#[derive(Clone, Copy)]
pub struct Prng(u64);

// xorshift64star Pseudo-Random Number Generator
// This class is based on original code written and dedicated
// to the public domain by Sebastiano Vigna (2014).
// It has the following characteristics:
//
//  -  Outputs 64-bit numbers
//  -  Passes Dieharder and SmallCrush test batteries
//  -  Does not require warm-up, no zeroland to escape
//  -  Internal state is a single 64-bit integer
//  -  Period is 2^64 - 1
//
// For further analysis see
//   <http://vigna.di.unimi.it/ftp/papers/xorshift.pdf>
impl Prng {
    pub fn new(seed: u64) -> Prng {
        debug_assert!(seed != 0);
        Prng(seed)
    }

    pub fn rand64(&mut self) -> u64 {
        self.0 ^= self.0 >> 12;
        self.0 ^= self.0 << 25;
        self.0 ^= self.0 >> 27;
        u64::wrapping_mul(self.0, 2_685_821_657_736_338_717)
    }

    // Output values only have 1/8th of their bits set on average. Magic
    // candidates with few bits set are found much faster.
    pub fn sparse_rand64(&mut self) -> u64 {
        self.rand64() & self.rand64() & self.rand64()
    }
}

pub fn engine_info(to_uci: bool) -> String {
    format!(
        "poscore {}{}",
        env!("CARGO_PKG_VERSION"),
        if to_uci {
            "\nid author SunnyWar, T. Romstad, M. Costalba, J. Kiiski, G. Linscott"
        } else {
            " position core based on Rockfish"
        }
    )
}
