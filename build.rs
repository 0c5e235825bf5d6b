use vergen_gitcl::{Emitter, Gitcl};

// Git branch, short SHA and dirty flag for `version_string`.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let gitcl = Gitcl::builder().branch(true).sha(true).dirty(true).build();
    Emitter::default().add_instructions(&gitcl)?.emit()?;
    Ok(())
}
