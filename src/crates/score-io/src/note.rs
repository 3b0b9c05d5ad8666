use melody_core::key::PITCH_CLASS_NAMES;

const KERN_LETTERS: [&str; 12] = [
    "c", "c#", "d", "d#", "e", "f", "f#", "g", "g#", "a", "a#", "b",
];

/// Scientific pitch name for a MIDI note number (e.g. "C4", "Bb3")
pub fn pitch_name(pitch: u8) -> String {
    let octave = (pitch / 12) as i32 - 1;
    format!("{}{}", PITCH_CLASS_NAMES[(pitch % 12) as usize], octave)
}

/// Humdrum kern spelling: middle C is `c`, the octave above `cc`, the octave
/// below `C`, two below `CC`. Black keys are spelled with sharps.
pub fn kern_pitch(pitch: u8) -> String {
    let name = KERN_LETTERS[(pitch % 12) as usize];
    let (letter, accidental) = name.split_at(1);
    let octave = (pitch / 12) as i32 - 1;

    let letters = if octave >= 4 {
        letter.repeat((octave - 3) as usize)
    } else {
        letter.to_uppercase().repeat((4 - octave) as usize)
    };
    format!("{}{}", letters, accidental)
}

/// MIDI number from kern letters and accidentals, e.g. (`"cc"`, 1) for C#5.
///
/// `letters` must be one letter a-g repeated, in a single case.
pub fn kern_to_midi(letters: &str, alteration: i32) -> Option<u8> {
    let first = letters.chars().next()?;
    if !letters.chars().all(|c| c == first) {
        return None;
    }
    let pc = match first.to_ascii_lowercase() {
        'c' => 0,
        'd' => 2,
        'e' => 4,
        'f' => 5,
        'g' => 7,
        'a' => 9,
        'b' => 11,
        _ => return None,
    };
    let count = letters.len() as i32;
    let octave = if first.is_ascii_lowercase() {
        3 + count
    } else {
        4 - count
    };
    let midi = (octave + 1) * 12 + pc + alteration;
    u8::try_from(midi).ok().filter(|&m| m <= 127)
}
