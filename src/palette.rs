use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rustc_hash::{FxHashMap, FxHashSet};
use sha2::{Digest, Sha256};

/// Seed used for every palette shuffle.
pub const PALETTE_SEED: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    /// Parse `#RRGGBB`, `R,G,B` or one of a handful of named colors.
    pub fn parse(s: &str) -> Option<Rgb> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            if hex.len() != 6 {
                return None;
            }
            let r = u8::from_str_radix(hex.get(0..2)?, 16).ok()?;
            let g = u8::from_str_radix(hex.get(2..4)?, 16).ok()?;
            let b = u8::from_str_radix(hex.get(4..6)?, 16).ok()?;
            return Some(Rgb::new(r, g, b));
        }
        if s.contains(',') {
            let parts: Vec<u8> = s
                .split(',')
                .map(|p| p.trim().parse().ok())
                .collect::<Option<Vec<u8>>>()?;
            return match parts.as_slice() {
                [r, g, b] => Some(Rgb::new(*r, *g, *b)),
                _ => None,
            };
        }
        match s.to_ascii_lowercase().as_str() {
            "black" => Some(BLACK),
            "white" => Some(WHITE),
            "grey" | "gray" => Some(GREY),
            "skyblue" => Some(SKY_BLUE),
            "lightcoral" => Some(LIGHT_CORAL),
            _ => None,
        }
    }

    fn lerp(self, other: Rgb, t: f64) -> Rgb {
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgb::new(mix(self.r, other.r), mix(self.g, other.g), mix(self.b, other.b))
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

pub const BLACK: Rgb = Rgb::new(0, 0, 0);
pub const WHITE: Rgb = Rgb::new(255, 255, 255);
pub const GREY: Rgb = Rgb::new(169, 169, 169);
pub const SKY_BLUE: Rgb = Rgb::new(135, 206, 235);
pub const LIGHT_CORAL: Rgb = Rgb::new(240, 128, 128);

/// Default 10-class categorical cycle, used as-is for small cluster sets.
pub const CATEGORY_10: [Rgb; 10] = [
    Rgb::new(31, 119, 180),  // #1F77B4
    Rgb::new(255, 127, 14),  // #FF7F0E
    Rgb::new(44, 160, 44),   // #2CA02C
    Rgb::new(214, 39, 40),   // #D62728
    Rgb::new(148, 103, 189), // #9467BD
    Rgb::new(140, 86, 75),   // #8C564B
    Rgb::new(227, 119, 194), // #E377C2
    Rgb::new(127, 127, 127), // #7F7F7F
    Rgb::new(188, 189, 34),  // #BCBD22
    Rgb::new(23, 190, 207),  // #17BECF
];

/// Curated 20-color palette for cell clusters.
pub const CURATED_20: [Rgb; 20] = [
    Rgb::new(213, 31, 38),   // #D51F26
    Rgb::new(39, 46, 106),   // #272E6A
    Rgb::new(32, 138, 66),   // #208A42
    Rgb::new(137, 40, 143),  // #89288F
    Rgb::new(244, 125, 43),  // #F47D2B
    Rgb::new(254, 229, 0),   // #FEE500
    Rgb::new(138, 159, 209), // #8A9FD1
    Rgb::new(192, 108, 171), // #C06CAB
    Rgb::new(230, 194, 220), // #E6C2DC
    Rgb::new(144, 213, 228), // #90D5E4
    Rgb::new(137, 199, 95),  // #89C75F
    Rgb::new(243, 123, 125), // #F37B7D
    Rgb::new(153, 131, 189), // #9983BD
    Rgb::new(210, 75, 39),   // #D24B27
    Rgb::new(59, 188, 168),  // #3BBCA8
    Rgb::new(110, 75, 158),  // #6E4B9E
    Rgb::new(12, 114, 124),  // #0C727C
    Rgb::new(126, 20, 22),   // #7E1416
    Rgb::new(216, 167, 103), // #D8A767
    Rgb::new(61, 61, 61),    // #3D3D3D
];

/// Label -> color lookup that remembers the order labels were first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Palette {
    colors: FxHashMap<String, Rgb>,
    order: Vec<String>,
}

impl Palette {
    /// Later inserts of the same label overwrite the color.
    pub fn insert(&mut self, label: &str, color: Rgb) {
        if self.colors.insert(label.to_string(), color).is_none() {
            self.order.push(label.to_string());
        }
    }

    pub fn get(&self, label: &str) -> Option<Rgb> {
        self.colors.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Rgb)> + '_ {
        self.order.iter().map(move |l| (l.as_str(), self.colors[l]))
    }

    /// Tab-separated `label<TAB>#RRGGBB` lines with a header.
    pub fn to_tsv(&self) -> String {
        let mut content = String::from("label\tcolor\n");
        for (label, color) in self.iter() {
            content.push_str(&format!("{}\t{}\n", label, color));
        }
        content
    }
}

/// Sample `n` evenly spaced colors from a piecewise-linear gradient
/// through `anchors`.
///
/// Samples are rounded to 8-bit channels, so neighbouring samples of a
/// long gradient can coincide (first seen around 535 samples through the
/// curated palette).
pub fn sample_gradient(anchors: &[Rgb], n: usize) -> Vec<Rgb> {
    match (anchors.len(), n) {
        (_, 0) | (0, _) => return Vec::new(),
        (1, _) => return vec![anchors[0]; n],
        (_, 1) => return vec![anchors[0]],
        _ => {}
    }

    let segments = (anchors.len() - 1) as f64;
    (0..n)
        .map(|i| {
            let pos = i as f64 / (n - 1) as f64 * segments;
            let k = (pos.floor() as usize).min(anchors.len() - 2);
            anchors[k].lerp(anchors[k + 1], pos - k as f64)
        })
        .collect()
}

/// Move every repeated color to the nearest unused one, stepping a single
/// channel at a time (blue, then green, then red).
fn separate_duplicates(colors: &mut [Rgb]) {
    let mut seen: FxHashSet<Rgb> = FxHashSet::default();
    for color in colors.iter_mut() {
        if seen.insert(*color) {
            continue;
        }
        let original = *color;
        'search: for step in 1..=255i16 {
            for delta in [step, -step] {
                for channel in 0..3 {
                    let mut candidate = original;
                    let value = match channel {
                        0 => &mut candidate.b,
                        1 => &mut candidate.g,
                        _ => &mut candidate.r,
                    };
                    let shifted = *value as i16 + delta;
                    if !(0..=255).contains(&shifted) {
                        continue;
                    }
                    *value = shifted as u8;
                    if seen.insert(candidate) {
                        *color = candidate;
                        break 'search;
                    }
                }
            }
        }
    }
}

/// Assign colors to cluster labels with a fresh generator seeded with
/// [`PALETTE_SEED`]. The same labels always give the same palette.
pub fn assign_palette<S: AsRef<str>>(labels: &[S]) -> Palette {
    let mut rng = ChaCha8Rng::seed_from_u64(PALETTE_SEED);
    assign_palette_with_rng(labels, &mut rng)
}

/// Three tiers by cluster count: the categorical cycle up to 10 labels,
/// the shuffled curated palette up to 20, and a shuffled gradient
/// through the curated palette beyond that.
pub fn assign_palette_with_rng<S: AsRef<str>, R: Rng + ?Sized>(labels: &[S], rng: &mut R) -> Palette {
    let n = labels.len();
    let colors: Vec<Rgb> = if n <= CATEGORY_10.len() {
        CATEGORY_10[..n].to_vec()
    } else {
        let mut curated = CURATED_20.to_vec();
        curated.shuffle(rng);
        if n <= curated.len() {
            curated.truncate(n);
            curated
        } else {
            let mut sampled = sample_gradient(&curated, n);
            separate_duplicates(&mut sampled);
            sampled.shuffle(rng);
            sampled
        }
    };

    let mut palette = Palette::default();
    for (label, color) in labels.iter().zip(colors) {
        palette.insert(label.as_ref(), color);
    }
    palette
}

/// Stable color derived from the SHA-256 digest of a name, brightened so
/// the strongest channel is clearly visible.
pub fn name_color(name: &str) -> Rgb {
    let mut hasher = Sha256::new();
    hasher.update(name.as_bytes());
    let digest = hasher.finalize();

    let mut r = digest[24] as f32 / 255.0;
    let mut g = digest[8] as f32 / 255.0;
    let mut b = digest[16] as f32 / 255.0;

    let sum = r + g + b;
    if sum > 0.0 {
        r /= sum;
        g /= sum;
        b /= sum;
    }

    let max_component = r.max(g).max(b);
    let f = if max_component > 0.0 {
        1.5f32.min(1.0 / max_component)
    } else {
        1.0
    };

    let scale = |c: f32| (255.0 * (c * f).min(1.0)).round() as u8;
    Rgb::new(scale(r), scale(g), scale(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("cluster_{}", i)).collect()
    }

    #[test]
    fn empty_input_gives_empty_palette() {
        let empty: [&str; 0] = [];
        assert!(assign_palette(&empty).is_empty());
    }

    #[test]
    fn small_sets_use_category_cycle_in_order() {
        let labels = labels(5);
        let palette = assign_palette(&labels);
        assert_eq!(palette.len(), 5);
        for (i, (label, color)) in palette.iter().enumerate() {
            assert_eq!(label, labels[i]);
            assert_eq!(color, CATEGORY_10[i]);
        }
    }

    #[test]
    fn ten_labels_still_use_category_cycle() {
        let palette = assign_palette(&labels(10));
        let colors: Vec<Rgb> = palette.iter().map(|(_, c)| c).collect();
        assert_eq!(colors, CATEGORY_10.to_vec());
    }

    #[test]
    fn medium_sets_draw_from_curated_palette() {
        let palette = assign_palette(&labels(15));
        let curated: FxHashSet<Rgb> = CURATED_20.iter().copied().collect();
        let used: FxHashSet<Rgb> = palette.iter().map(|(_, c)| c).collect();
        assert_eq!(used.len(), 15);
        assert!(used.is_subset(&curated));
    }

    #[test]
    fn palette_is_deterministic() {
        let labels = labels(15);
        assert_eq!(assign_palette(&labels), assign_palette(&labels));

        let labels = labels_large();
        assert_eq!(assign_palette(&labels), assign_palette(&labels));
    }

    fn labels_large() -> Vec<String> {
        labels(50)
    }

    #[test]
    fn large_sets_get_distinct_gradient_colors() {
        let palette = assign_palette(&labels_large());
        let used: FxHashSet<Rgb> = palette.iter().map(|(_, c)| c).collect();
        assert_eq!(palette.len(), 50);
        assert_eq!(used.len(), 50);
    }

    #[test]
    fn twenty_labels_use_every_curated_color_once() {
        let palette = assign_palette(&labels(20));
        let colors: Vec<Rgb> = palette.iter().map(|(_, c)| c).collect();
        let used: FxHashSet<Rgb> = colors.iter().copied().collect();
        let curated: FxHashSet<Rgb> = CURATED_20.iter().copied().collect();
        assert_eq!(colors.len(), 20);
        assert_eq!(used, curated);
    }

    #[test]
    fn twenty_one_labels_switch_to_the_gradient() {
        let palette = assign_palette(&labels(21));
        let used: FxHashSet<Rgb> = palette.iter().map(|(_, c)| c).collect();
        let curated: FxHashSet<Rgb> = CURATED_20.iter().copied().collect();
        assert_eq!(palette.len(), 21);
        assert_eq!(used.len(), 21);
        assert!(!used.is_subset(&curated));
        assert_eq!(palette, assign_palette(&labels(21)));
    }

    #[test]
    fn very_large_sets_stay_distinct() {
        for n in [535, 600, 2000] {
            let palette = assign_palette(&labels(n));
            let used: FxHashSet<Rgb> = palette.iter().map(|(_, c)| c).collect();
            assert_eq!(used.len(), n, "repeated colors for {} labels", n);
        }
    }

    #[test]
    fn repeated_colors_are_nudged_apart() {
        let mut colors = vec![Rgb::new(10, 10, 255), Rgb::new(10, 10, 255), Rgb::new(10, 10, 255)];
        separate_duplicates(&mut colors);
        assert_eq!(colors[0], Rgb::new(10, 10, 255));
        // Blue is saturated, so the first free step is on green, then red.
        assert_eq!(colors[1], Rgb::new(10, 11, 255));
        assert_eq!(colors[2], Rgb::new(11, 10, 255));
    }

    #[test]
    fn injected_generator_drives_the_shuffle() {
        let labels = labels(12);
        let mut a = ChaCha8Rng::seed_from_u64(PALETTE_SEED);
        assert_eq!(assign_palette_with_rng(&labels, &mut a), assign_palette(&labels));

        let mut b = ChaCha8Rng::seed_from_u64(7);
        let mut c = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(
            assign_palette_with_rng(&labels, &mut b),
            assign_palette_with_rng(&labels, &mut c)
        );
    }

    #[test]
    fn duplicate_labels_last_write_wins() {
        let palette = assign_palette(&["a", "b", "a"]);
        assert_eq!(palette.len(), 2);
        assert_eq!(palette.get("a"), Some(CATEGORY_10[2]));
        assert_eq!(palette.get("b"), Some(CATEGORY_10[1]));
        let order: Vec<&str> = palette.iter().map(|(l, _)| l).collect();
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn gradient_hits_both_ends() {
        let anchors = [BLACK, WHITE];
        let g = sample_gradient(&anchors, 3);
        assert_eq!(g, vec![BLACK, Rgb::new(128, 128, 128), WHITE]);
        assert!(sample_gradient(&anchors, 0).is_empty());
    }

    #[test]
    fn parses_colors() {
        assert_eq!(Rgb::parse("#87CEEB"), Some(SKY_BLUE));
        assert_eq!(Rgb::parse("240, 128, 128"), Some(LIGHT_CORAL));
        assert_eq!(Rgb::parse("Black"), Some(BLACK));
        assert_eq!(Rgb::parse("#12"), None);
        assert_eq!(Rgb::parse("1,2"), None);
        assert_eq!(Rgb::parse("chartreuse"), None);
        assert_eq!(SKY_BLUE.to_string(), "#87CEEB");
    }

    #[test]
    fn name_colors_are_stable_and_bright() {
        let a = name_color("enhancer");
        assert_eq!(a, name_color("enhancer"));
        assert!(a.r.max(a.g).max(a.b) > 100);
    }
}
