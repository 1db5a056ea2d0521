pub struct DefaultsConfig {
    pub mpi_cores: usize,
    pub omp_threads: i32,
    pub lmp_executable: &'static str,
    pub mpirun: &'static str,

    pub output_dir: &'static str,
    pub input_data: &'static str,
    pub molecule_file: &'static str,
    pub potential_file: &'static str,

    pub pair_style: &'static str,
    pub elements: &'static [&'static str],
    pub neighbor_skin: f64,

    pub lattice_constant: f64,
    pub box_width: f64,
    pub box_bottom: f64,
    pub surface_top: f64,

    pub projectile_x: f64,
    pub projectile_y: f64,
    pub height_offset: f64,
    pub energy_ev: f64,
    pub velocity_factor: f64,

    pub timestep: f64,
    pub steps: u64,
    pub dump_every: u32,
    pub temperature: f64,

    pub zero_level: f64,
    pub cluster_cutoff: f64,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            mpi_cores: 1,
            omp_threads: 4,
            lmp_executable: "lmp",
            mpirun: "mpirun",

            output_dir: "results",
            input_data: "fall700.input.data",
            molecule_file: "mol.C60",
            potential_file: "SiC.tersoff.zbl",

            pair_style: "tersoff/zbl",
            elements: &["Si", "C"],
            neighbor_skin: 3.0,

            lattice_constant: 5.43,
            box_width: 12.0,
            box_bottom: -16.0,
            surface_top: 15.3,

            projectile_x: 0.0,
            projectile_y: 0.0,
            height_offset: 20.0,
            energy_ev: 8000.0,
            velocity_factor: 5.174,

            timestep: 0.001,
            steps: 200,
            dump_every: 20,
            temperature: 700.0,

            zero_level: 83.391,
            cluster_cutoff: 3.0,
        }
    }
}
