//! Prompt rendering
//!
//! One request payload per batch: the fixed style guide as the system
//! instruction, then one context block per record. Rendering is a pure
//! function of the batch and `PromptConfig`, so prompts compare byte for byte.

use crate::models::{Batch, WorkItem};
use crate::services::response_parser::BLOCK_DELIMITER;

/// Line separating record context blocks in the user message
pub const RECORD_SEPARATOR: &str = "---";

const SYSTEM_PROMPT: &str = "\
You are a camellia cultivar reference writer. For each cultivar provided, produce three fields: TAGLINE, DESCRIPTION, and NOTES.

**TAGLINE**: One punchy sentence naming the single most distinctive thing about this cultivar. No species name. Be specific: unusual color, award history, famous parentage, extreme hardiness, historical significance, unique form. If information is sparse, focus on the most notable observable trait.

**DESCRIPTION**: A single flowing sentence covering the key facts in consistent order (omit any that are unknown): flower size and form, color, registration info, originator/location/year, parentage (for hybrids), bloom season, growth habit, awards. Natural prose, deliberately distinct from telegraphic register source text. Compact but readable. Do not start with the cultivar name.

**NOTES**: A 3-6 sentence narrative. Do NOT open with the cultivar name or species; the epithet already carries that. Focus on significance in the camellia world, origin story, appearance and garden merit, awards, and growing context. End with a brief source citation (for example \"Source: International Camellia Register\"). Authoritative but accessible tone for people who know camellias.

For each cultivar, output in exactly this format:
===CULTIVAR: <name>===
TAGLINE: <one sentence>
DESCRIPTION: <one flowing sentence>
NOTES: <3-6 sentence narrative>

Repeat the cultivar name exactly as given. If you have very little information about a cultivar, do your best with what is available. Never fabricate registration numbers or specific dates you are unsure of.";

const INSTRUCTION: &str = "Rewrite the following cultivar records. Use the existing description and notes as source material but produce fresh, parallel-structure text as specified.";

/// Built-in few-shot examples in the response grammar
const REFERENCE_EXAMPLES: &str = "\
--- Example 1 (Reticulata Hybrid) ---
Cultivar: Adrian Bourres
Epithet: Camellia reticulata 'Adrienne Boueres'
Category: RH

===CULTIVAR: Adrian Bourres===
TAGLINE: A chance seedling of the celebrated 'Frank Houser' that carries its parent's scale in rich dark pink.
DESCRIPTION: Medium-large 10.7cm dark pink rose form double blooms, registered as ACS #2889 in 2013 by Howard and Mary Rhodes of Tallahassee, Florida, from a 'Frank Houser' seedling that first flowered in 2008, opening mid to late season on a spreading plant.
NOTES: Raised in a Tallahassee garden, this reticulata hybrid took nine years from seed to its first flowers in 2008 and was registered with the American Camellia Society five years later. The substantial blooms set dark pink petals against yellow anthers and white filaments. Flowers fall intact, keeping the garden tidy. Handsome mid-green foliage and a spreading habit suit it to exhibition and landscape use alike. Source: International Camellia Register

--- Example 2 (Sasanqua) ---
Cultivar: Asakura
Epithet: Camellia sasanqua 'Asakura'
Category: S

===CULTIVAR: Asakura===
TAGLINE: A Kurume sasanqua whose large waxy white flowers are brushed with pale red.
DESCRIPTION: Large semi-double to double white flowers shaded pale red, originating in Kurume, Fukuoka Prefecture, Japan, blooming from fall into midwinter on a tall upright plant.
NOTES: Kurume has long been one of the great centers of Japanese camellia breeding, and this selection shows why. Many golden stamens light the centre of each waxy bloom, carried among glossy dark green, toothed leaves on thin wiry stems. Its hardiness and long fall-to-midwinter season make it a dependable choice for hedges, borders and specimen planting. Source: International Camellia Register

--- Example 3 (Species) ---
Cultivar: Camellia gauchoweninsis
Epithet: Camellia gauchowensis
Category: Species

===CULTIVAR: Camellia gauchoweninsis===
TAGLINE: One of China's most important oil-tea camellias, now folded into C. drupifera.
DESCRIPTION: Slightly fragrant white single flowers 6-7.5cm across with five to eight obovate petals, described in 1961 by Chang Hung-ta from southwestern Guangdong and southern Guangxi, blooming December to January on an evergreen shrub or small tree of 2-8m.
NOTES: First described in 1961 and now treated as a synonym of Camellia drupifera, this member of Section Oleifera has long been valued for the oil pressed from its seed. Solitary white flowers open in the depth of winter. It grows wild in the lowlands of Guangdong and Guangxi and is hardy to USDA Zone 9. Source: International Camellia Register and Flora of China";

/// Rendering options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptConfig {
    /// Include the built-in few-shot reference examples
    pub include_examples: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            include_examples: true,
        }
    }
}

/// Rendered request payload for one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    pub fn len(&self) -> usize {
        self.system.len() + self.user.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Renders batch prompts
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    config: PromptConfig,
}

impl PromptBuilder {
    pub fn new(config: PromptConfig) -> Self {
        Self { config }
    }

    pub fn system_prompt(&self) -> &'static str {
        SYSTEM_PROMPT
    }

    pub fn build(&self, batch: &Batch) -> Prompt {
        let mut user = String::from(INSTRUCTION);
        user.push_str("\n\n");

        if self.config.include_examples {
            user.push_str("## Reference examples (match this style)\n\n");
            user.push_str(REFERENCE_EXAMPLES);
            user.push_str("\n\n## Records\n\n");
        }

        let blocks: Vec<String> = batch.items.iter().map(render_record).collect();
        user.push_str(&blocks.join(&format!("\n\n{}\n\n", RECORD_SEPARATOR)));

        Prompt {
            system: SYSTEM_PROMPT.to_string(),
            user,
        }
    }
}

fn render_record(item: &WorkItem) -> String {
    format!(
        "Cultivar: {}\nEpithet: {}\nCategory: {}\nColor/Form: {}\nCurrent Description: {}\nCurrent Notes: {}",
        delimiter_safe_name(&item.name),
        single_line(&item.epithet),
        single_line(&item.category),
        single_line(&item.color_form),
        item.description.trim(),
        item.notes.trim(),
    )
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Name as rendered into the prompt and expected back on the marker line
///
/// Collapses line breaks and runs of whitespace, and breaks up any `===`
/// so an echoed name can never close its own `===CULTIVAR:` marker. The
/// matcher compares against this form.
pub fn delimiter_safe_name(name: &str) -> String {
    let mut safe = single_line(name);
    while safe.contains(BLOCK_DELIMITER) {
        safe = safe.replace(BLOCK_DELIMITER, "= = =");
    }
    safe
}
