/// Nickname generation for users who leave the nickname prompt empty
use markov_namegen::{CharacterChainGenerator, RandomTextGenerator};

/// Seed names for the character chain
const TRAINING_NAMES: &[&str] = &[
    "Aldric", "Theron", "Gareth", "Mirabel", "Isolde", "Lysander", "Elowen", "Rowan",
    "Caelum", "Astrid", "Eirik", "Freya", "Magnus", "Sigrid", "Bjorn", "Ingrid",
    "Apollo", "Diana", "Atlas", "Selene", "Orion", "Luna", "Phoenix", "Aurora",
    "Finn", "Maeve", "Cormac", "Niamh", "Declan", "Siobhan", "Aidan", "Brigid",
    "Zephyr", "Ember", "Storm", "Raven", "Wolf", "Bear", "Hawk", "Fox",
];

const MAX_BASE_LEN: usize = 10;

fn create_name_generator() -> CharacterChainGenerator {
    CharacterChainGenerator::builder()
        .with_order(2)
        .with_prior(0.01)
        .train(TRAINING_NAMES.iter().copied())
        .build()
}

/// Generate a pronounceable nickname such as `Theron_42`
///
/// Nicknames are not required to be unique in a room, the numeric suffix only
/// makes accidental clashes between generated names less likely.
pub fn generate_nickname() -> String {
    let mut generator = create_name_generator();

    let base = loop {
        let name = generator.generate_one();
        if !name.is_empty()
            && name.len() <= MAX_BASE_LEN
            && name.chars().all(|c| c.is_ascii_alphanumeric())
        {
            break name;
        }
    };
    let suffix: u16 = rand::random::<u16>() % 1000;
    format!("{}_{}", base, suffix)
}
